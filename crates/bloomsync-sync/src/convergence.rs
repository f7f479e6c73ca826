//! Convergence verification after a reconciliation round.
//!
//! The responder hashes its merged file and the initiator compares that
//! against its own file hash. A Bloom filter false positive hides a line
//! from the exchange, so a mismatch here is the signal to fall back to a
//! full-file transfer.

use bloomsync_core::ContentHash;
use bloomsync_store::{Document, DocumentExt};

use crate::error::Result;

/// Result of convergence verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvergenceResult {
    /// Both files are byte-identical.
    Converged,
    /// Files differ; a full-file transfer is needed.
    Diverged {
        local: ContentHash,
        remote: ContentHash,
    },
}

impl ConvergenceResult {
    /// Check if the peers have converged.
    pub fn is_converged(&self) -> bool {
        matches!(self, ConvergenceResult::Converged)
    }
}

/// Compare a local file hash with the hash the peer reported.
pub fn verify_convergence(local: &ContentHash, remote: &ContentHash) -> ConvergenceResult {
    if local == remote {
        ConvergenceResult::Converged
    } else {
        ConvergenceResult::Diverged {
            local: *local,
            remote: *remote,
        }
    }
}

/// Compare a document's current contents with the hash the peer reported.
pub async fn verify_document<D: Document + ?Sized>(
    document: &D,
    remote: &ContentHash,
) -> Result<ConvergenceResult> {
    let local = document.content_hash().await?;
    Ok(verify_convergence(&local, remote))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bloomsync_store::MemoryDocument;

    #[test]
    fn test_equal_hashes_converge() {
        let h = ContentHash::hash(b"x\ny\nz\n");
        assert!(verify_convergence(&h, &h).is_converged());
    }

    #[test]
    fn test_different_hashes_diverge() {
        let a = ContentHash::hash(b"x\ny\nz\n");
        let b = ContentHash::hash(b"x\ny\nw\n");
        assert_eq!(
            verify_convergence(&a, &b),
            ConvergenceResult::Diverged {
                local: a,
                remote: b
            }
        );
    }

    #[tokio::test]
    async fn test_verify_document() {
        let doc = MemoryDocument::new("a", "x\ny\n");
        let same = ContentHash::hash(b"x\ny\n");
        let other = ContentHash::hash(b"x\n");

        assert!(verify_document(&doc, &same).await.unwrap().is_converged());
        assert!(!verify_document(&doc, &other).await.unwrap().is_converged());
    }
}
