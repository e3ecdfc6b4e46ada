//! Reverse-DNS enrichment of alert endpoints
//!
//! Lookups are blocking and run inline in the frame path, so the system resolver is
//! built with an explicit timeout and a single attempt. Results (including failures,
//! stored as the numeric address) are cached for a fixed TTL measured in capture time.

use fnv::FnvHashMap;
use libsensor_tools::Timestamp;
use std::io;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;
use tracing::{debug, warn};
use trust_dns_resolver::config::{ResolverConfig, ResolverOpts};
use trust_dns_resolver::Resolver;

pub const DEFAULT_DNS_TTL: Duration = Duration::from_secs(600);

/// A reverse resolver: address to host name
pub trait ReverseResolver {
    /// Return the host name of `addr`, or `None` if it could not be resolved
    fn reverse_lookup(&mut self, addr: Ipv4Addr) -> Option<String>;
}

/// Reverse resolver using the system configuration (`/etc/resolv.conf`)
pub struct SystemResolver {
    resolver: Resolver,
}

impl SystemResolver {
    pub fn new(timeout: Duration) -> io::Result<SystemResolver> {
        let (config, mut opts) = match trust_dns_resolver::system_conf::read_system_conf() {
            Ok(conf) => conf,
            Err(e) => {
                warn!("Could not read system resolver configuration ({e}), using defaults");
                (ResolverConfig::default(), ResolverOpts::default())
            }
        };
        opts.timeout = timeout;
        opts.attempts = 1;
        let resolver = Resolver::new(config, opts)?;
        Ok(SystemResolver { resolver })
    }
}

impl ReverseResolver for SystemResolver {
    fn reverse_lookup(&mut self, addr: Ipv4Addr) -> Option<String> {
        match self.resolver.reverse_lookup(IpAddr::V4(addr)) {
            Ok(lookup) => {
                let name = lookup.iter().next()?.to_string();
                let name = name.trim_end_matches('.');
                if name.is_empty() {
                    None
                } else {
                    Some(name.to_owned())
                }
            }
            Err(e) => {
                debug!("reverse lookup failed for {addr}: {e}");
                None
            }
        }
    }
}

/// Resolver used when lookups are disabled: every address stays numeric
#[derive(Default)]
pub struct NoLookup;

impl ReverseResolver for NoLookup {
    fn reverse_lookup(&mut self, _addr: Ipv4Addr) -> Option<String> {
        None
    }
}

#[derive(Clone, Debug)]
pub struct DnsCacheEntry {
    /// Resolved name, or the numeric address if resolution failed
    pub host: String,
    pub resolved_at: Timestamp,
}

/// TTL-bounded reverse-DNS cache in front of a `ReverseResolver`
pub struct DnsEnrichment {
    resolver: Box<dyn ReverseResolver>,
    cache: FnvHashMap<Ipv4Addr, DnsCacheEntry>,
    ttl: Duration,
    capacity: usize,
    lookups: usize,
}

impl DnsEnrichment {
    pub fn new(resolver: Box<dyn ReverseResolver>, ttl: Duration, capacity: usize) -> Self {
        DnsEnrichment {
            resolver,
            cache: FnvHashMap::default(),
            ttl,
            capacity: capacity.max(1),
            lookups: 0,
        }
    }

    /// Return the host name of `addr`
    ///
    /// An absent address short-circuits to an empty string. A cached entry younger
    /// than the TTL is returned as is; otherwise a lookup is performed, and its result
    /// (or the numeric address on failure) is cached.
    pub fn resolve(&mut self, addr: Option<Ipv4Addr>, now: Timestamp) -> String {
        let addr = match addr {
            Some(addr) => addr,
            None => return String::new(),
        };
        if let Some(entry) = self.cache.get(&addr) {
            if now.saturating_since(entry.resolved_at) < self.ttl {
                return entry.host.clone();
            }
        }
        self.lookups += 1;
        let host = self
            .resolver
            .reverse_lookup(addr)
            .unwrap_or_else(|| addr.to_string());
        debug!("resolved {addr} -> {host}");
        if !self.cache.contains_key(&addr) && self.cache.len() >= self.capacity {
            self.make_room(now);
        }
        self.cache.insert(
            addr,
            DnsCacheEntry {
                host: host.clone(),
                resolved_at: now,
            },
        );
        host
    }

    fn make_room(&mut self, now: Timestamp) {
        let ttl = self.ttl;
        self.cache
            .retain(|_, entry| now.saturating_since(entry.resolved_at) < ttl);
        if self.cache.len() >= self.capacity {
            let oldest = self
                .cache
                .iter()
                .min_by_key(|(_, entry)| entry.resolved_at)
                .map(|(addr, _)| *addr);
            if let Some(addr) = oldest {
                self.cache.remove(&addr);
            }
        }
    }

    /// Cached entry for `addr`, regardless of its age
    pub fn entry(&self, addr: Ipv4Addr) -> Option<&DnsCacheEntry> {
        self.cache.get(&addr)
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Number of resolutions performed (cache misses)
    pub fn lookups(&self) -> usize {
        self.lookups
    }
}
