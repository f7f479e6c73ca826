//! Property tests: any two files end a round identical.

use std::time::Duration;

use bloomsync::SyncConfig;
use bloomsync_testkit::fixtures::drive;
use bloomsync_testkit::{edited_pair, file_text, PeerPair};
use proptest::prelude::*;

/// Run one round from A and return both files afterwards.
fn sync_once(a: &str, b: &str) -> (Vec<u8>, Vec<u8>) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();

    runtime.block_on(async {
        let pair = PeerPair::new(a, b).await;
        let (doc_a, doc_b) = (pair.doc_a.clone(), pair.doc_b.clone());
        let (mut peer_a, mut peer_b) = pair.into_peers(SyncConfig::default()).unwrap();

        peer_a.on_local_change().await.unwrap();
        drive(&mut peer_a, &mut peer_b, Duration::from_millis(5))
            .await
            .unwrap();

        assert!(peer_a.state().is_idle());
        assert!(peer_b.state().is_idle());
        (doc_a.contents(), doc_b.contents())
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_edited_files_converge((a, b) in edited_pair()) {
        let (after_a, after_b) = sync_once(&a, &b);
        prop_assert_eq!(&after_a, a.as_bytes());
        prop_assert_eq!(after_b, after_a);
    }

    #[test]
    fn prop_unrelated_files_converge(a in file_text(12), b in file_text(12)) {
        let (after_a, after_b) = sync_once(&a, &b);
        prop_assert_eq!(&after_a, a.as_bytes());
        prop_assert_eq!(after_b, after_a);
    }
}
