//! Digest-keyed blob size accumulator

use crate::error::{Result, SizerError};
use crate::image::BlobDigest;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use tracing::warn;

/// Mapping from blob digest to byte size.
///
/// Content addressing means a digest always names the same bytes, so
/// inserting a digest twice is a no-op and merging tables is idempotent and
/// order-independent. Iteration is in digest order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlobSizeTable {
    blobs: BTreeMap<BlobDigest, u64>,
}

impl BlobSizeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `digest` with `size`. Returns `false` if the digest was
    /// already present, in which case the first size is kept.
    pub fn insert(&mut self, digest: BlobDigest, size: u64) -> bool {
        match self.blobs.entry(digest) {
            Entry::Vacant(slot) => {
                slot.insert(size);
                true
            }
            Entry::Occupied(existing) => {
                if *existing.get() != size {
                    warn!(
                        digest = %existing.key(),
                        recorded = *existing.get(),
                        reported = size,
                        "registry reported conflicting sizes for one digest"
                    );
                }
                false
            }
        }
    }

    /// Fold `other` into this table.
    pub fn merge(&mut self, other: BlobSizeTable) {
        for (digest, size) in other.blobs {
            self.insert(digest, size);
        }
    }

    pub fn get(&self, digest: &BlobDigest) -> Option<u64> {
        self.blobs.get(digest).copied()
    }

    pub fn contains(&self, digest: &BlobDigest) -> bool {
        self.blobs.contains_key(digest)
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    /// Sum of all sizes. Fails when the sizes a registry reported do not
    /// fit in a `u64`.
    pub fn total(&self) -> Result<u64> {
        self.blobs.values().try_fold(0u64, |sum, &size| {
            sum.checked_add(size).ok_or_else(|| {
                SizerError::DescriptorRead(format!(
                    "Total size of {} blobs overflows u64",
                    self.blobs.len()
                ))
            })
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&BlobDigest, u64)> + '_ {
        self.blobs.iter().map(|(digest, size)| (digest, *size))
    }
}

impl FromIterator<(BlobDigest, u64)> for BlobSizeTable {
    fn from_iter<I: IntoIterator<Item = (BlobDigest, u64)>>(iter: I) -> Self {
        let mut table = BlobSizeTable::new();
        for (digest, size) in iter {
            table.insert(digest, size);
        }
        table
    }
}
