//! Sharded map used to accumulate relevance from several threads.
//!
//! Keys are routed to one of N buckets by `key mod N`. Each bucket owns its
//! own ordered map behind its own mutex, so writers touching different
//! buckets never wait on each other.

use parking_lot::{MappedMutexGuard, Mutex, MutexGuard};
use std::collections::BTreeMap;

/// Integer keys that can be routed to a bucket.
pub trait ShardKey: Ord + Copy {
    fn bucket(&self, bucket_count: usize) -> usize;
}

macro_rules! impl_shard_key {
    ($($t:ty),*) => {
        $(impl ShardKey for $t {
            #[inline]
            fn bucket(&self, bucket_count: usize) -> usize {
                (*self as i128).rem_euclid(bucket_count as i128) as usize
            }
        })*
    };
}

impl_shard_key!(i8, i16, i32, i64, u8, u16, u32, u64, usize, isize);

pub struct ConcurrentMap<K, V> {
    buckets: Vec<Mutex<BTreeMap<K, V>>>,
}

/// Exclusive handle to one value; holds the owning bucket's lock until dropped.
pub type Access<'a, V> = MappedMutexGuard<'a, V>;

impl<K: ShardKey, V: Default> ConcurrentMap<K, V> {
    pub fn new(bucket_count: usize) -> Self {
        let bucket_count = bucket_count.max(1);
        Self { buckets: (0..bucket_count).map(|_| Mutex::new(BTreeMap::new())).collect() }
    }

    /// Lock the bucket owning `key` and return its value, inserting
    /// `V::default()` on first access.
    pub fn access(&self, key: K) -> Access<'_, V> {
        let guard = self.buckets[key.bucket(self.buckets.len())].lock();
        MutexGuard::map(guard, |map| map.entry(key).or_default())
    }

    /// Remove `key`, locking only its bucket.
    pub fn erase(&self, key: K) -> Option<V> {
        self.buckets[key.bucket(self.buckets.len())].lock().remove(&key)
    }

    /// Collapse all buckets into one ordered map. Buckets are locked one at a
    /// time in ascending index order.
    pub fn build_ordinary_map(&self) -> BTreeMap<K, V>
    where
        V: Clone,
    {
        let mut result = BTreeMap::new();
        for bucket in &self.buckets {
            let map = bucket.lock();
            result.extend(map.iter().map(|(k, v)| (*k, v.clone())));
        }
        result
    }

    /// Same as [`build_ordinary_map`](Self::build_ordinary_map) but moves the values out.
    pub fn into_ordinary_map(self) -> BTreeMap<K, V> {
        let mut result = BTreeMap::new();
        for bucket in self.buckets {
            result.append(&mut bucket.into_inner());
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rayon::prelude::*;

    #[test]
    fn access_inserts_default() {
        let map: ConcurrentMap<i32, f64> = ConcurrentMap::new(4);
        *map.access(7) += 1.5;
        *map.access(7) += 1.0;
        let merged = map.build_ordinary_map();
        assert_eq!(merged.get(&7), Some(&2.5));
    }

    #[test]
    fn routes_negative_keys() {
        let map: ConcurrentMap<i32, i32> = ConcurrentMap::new(3);
        *map.access(-4) = 9;
        assert_eq!(map.erase(-4), Some(9));
        assert_eq!(map.erase(-4), None);
    }

    #[test]
    fn merge_is_ordered() {
        let map: ConcurrentMap<u32, u32> = ConcurrentMap::new(5);
        for k in [17, 3, 42, 8, 0] {
            *map.access(k) = k * 2;
        }
        let keys: Vec<u32> = map.build_ordinary_map().into_keys().collect();
        assert_eq!(keys, vec![0, 3, 8, 17, 42]);
    }

    #[test]
    fn parallel_increments_are_not_lost() {
        let map: ConcurrentMap<u64, u64> = ConcurrentMap::new(7);
        (0..10_000u64).into_par_iter().for_each(|i| {
            *map.access(i % 100) += 1;
        });
        let merged = map.into_ordinary_map();
        assert_eq!(merged.len(), 100);
        assert!(merged.values().all(|&v| v == 100));
    }
}
