//! Cache behavior properties exercised through the public API.

use std::time::Duration;

use loadguard::cache::{AdaptiveCache, CacheConfig, EvictionStrategy};

fn cache_with(max_entries: usize, max_memory: u64, strategy: EvictionStrategy) -> AdaptiveCache {
    AdaptiveCache::new(
        CacheConfig::default()
            .with_max_entries(max_entries)
            .with_max_memory_bytes(max_memory)
            .with_strategy(strategy),
    )
}

#[test]
fn roundtrip_then_expiry() {
    let cache = cache_with(16, 1 << 20, EvictionStrategy::Ttl);

    cache
        .put("session:1", b"payload".to_vec(), Some(Duration::from_millis(40)))
        .unwrap();

    // Immediately visible...
    assert_eq!(cache.get("session:1"), Some(b"payload".to_vec()));

    // ...and gone once the TTL elapses
    std::thread::sleep(Duration::from_millis(60));
    assert_eq!(cache.get("session:1"), None);
    assert_eq!(cache.get_stats().expirations, 1);
}

#[test]
fn lru_scenario_keeps_recently_accessed() {
    let cache = cache_with(2, 1 << 20, EvictionStrategy::Lru);

    cache.put("a", vec![1], None).unwrap();
    std::thread::sleep(Duration::from_millis(5));
    cache.put("b", vec![2], None).unwrap();
    std::thread::sleep(Duration::from_millis(5));
    assert!(cache.get("a").is_some());
    std::thread::sleep(Duration::from_millis(5));
    cache.put("c", vec![3], None).unwrap();

    assert!(cache.get("a").is_some());
    assert!(cache.get("b").is_none());
    assert!(cache.get("c").is_some());
}

#[test]
fn limits_hold_under_arbitrary_sequences() {
    let max_entries = 8;
    let max_memory = 2_000;
    let cache = cache_with(max_entries, max_memory, EvictionStrategy::Adaptive);

    for i in 0..200 {
        let key = format!("item:{}", i % 30);
        let size = (i * 13) % 190;
        // Oversized puts are rejected, everything else must fit
        let _ = cache.put(&key, vec![0u8; size], None);

        if i % 3 == 0 {
            cache.get(&format!("item:{}", (i * 7) % 30));
        }

        let stats = cache.get_stats();
        assert!(stats.entry_count <= max_entries);
        assert!(stats.total_size_bytes <= max_memory);
    }
}

#[test]
fn oversize_rejection_leaves_cache_intact() {
    let cache = cache_with(8, 1_000, EvictionStrategy::Lru);
    cache.put("small", vec![0u8; 50], None).unwrap();

    // Per-entry budget is a tenth of memory: 100 bytes
    assert!(cache.put("big", vec![0u8; 500], None).is_err());

    assert_eq!(cache.entry_count(), 1);
    assert!(cache.get("small").is_some());
    assert_eq!(cache.get_stats().rejected_oversize, 1);
}

#[test]
fn adaptive_ttl_stays_within_documented_bounds() {
    let default_ttl = Duration::from_secs(100);
    let cache = AdaptiveCache::new(
        CacheConfig::default()
            .with_default_ttl(default_ttl)
            .with_strategy(EvictionStrategy::Adaptive),
    );

    // Hammer one prefix to mark it hot, then insert without explicit TTL
    for _ in 0..10 {
        cache.get("hot:key");
    }
    cache.put("hot:key", vec![1], None).unwrap();

    // Entries land with TTL in [0.5x, 2x] of the default; a hot prefix
    // must survive the default TTL horizon. Indirect check: the entry is
    // still retrievable well within 2x of default (cannot have been
    // clamped below 0.5x in either case here).
    assert!(cache.get("hot:key").is_some());
}

#[test]
fn hit_rate_reflects_lookups() {
    let cache = cache_with(16, 1 << 20, EvictionStrategy::Lru);
    cache.put("k", vec![1], None).unwrap();

    cache.get("k");
    cache.get("k");
    cache.get("k");
    cache.get("absent");

    let stats = cache.get_stats();
    assert_eq!(stats.hits, 3);
    assert_eq!(stats.misses, 1);
    assert!((stats.hit_rate() - 0.75).abs() < 1e-9);
}

#[test]
fn invalidation_by_key_and_prefix() {
    let cache = cache_with(16, 1 << 20, EvictionStrategy::Lru);
    cache.put("weather:zone:1", vec![1], None).unwrap();
    cache.put("weather:zone:2", vec![2], None).unwrap();
    cache.put("energy:meter", vec![3], None).unwrap();

    assert!(cache.invalidate("energy:meter"));
    assert_eq!(cache.invalidate_prefix("weather:"), 2);
    assert_eq!(cache.entry_count(), 0);

    cache.put("weather:zone:1", vec![9], None).unwrap();
    cache.clear();
    assert_eq!(cache.entry_count(), 0);
    assert_eq!(cache.get_stats().hits, 0);
}
