// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ordering and isolation properties of the conversation store.

use parley_config::model::StorageConfig;
use parley_core::types::{ChatId, HistoryQuery, Role, ThreadDefaults};
use parley_core::StorageAdapter;
use parley_storage::SqliteStorage;
use proptest::prelude::*;

async fn storage(dir: &tempfile::TempDir, max_messages: usize) -> SqliteStorage {
    let path = dir.path().join("props.db");
    let config = StorageConfig {
        database_path: path.to_string_lossy().into_owned(),
        max_messages_per_thread: max_messages,
        ..StorageConfig::default()
    };
    let defaults = ThreadDefaults {
        topic: "general".into(),
        agent: "assistant".into(),
        model: "m".into(),
        language: "en".into(),
    };
    let storage = SqliteStorage::new(config, defaults);
    storage.initialize().await.unwrap();
    storage
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// Interleaved appends to two topics come back per topic, in call order.
    #[test]
    fn history_preserves_call_order(ops in proptest::collection::vec((any::<bool>(), "[a-z]{1,8}"), 1..30)) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let dir = tempfile::tempdir().unwrap();
            let store = storage(&dir, 1000).await;
            let chat = ChatId(1);

            let mut expected_a = Vec::new();
            let mut expected_b = Vec::new();
            for (to_a, text) in &ops {
                let topic = if *to_a { "a" } else { "b" };
                store.append(chat, topic, Role::User, text, "assistant").await.unwrap();
                if *to_a { expected_a.push(text.clone()) } else { expected_b.push(text.clone()) }
            }

            for (topic, expected) in [("a", expected_a), ("b", expected_b)] {
                let query = HistoryQuery { chat_id: chat, topic: Some(topic.into()), limit: 1000 };
                let got: Vec<String> = store
                    .get_history(&query)
                    .await
                    .unwrap()
                    .into_iter()
                    .map(|m| m.content)
                    .collect();
                prop_assert_eq!(got, expected);
            }
            Ok(())
        })?;
    }

    /// Count-based retention keeps exactly the newest messages and never the empty set.
    #[test]
    fn retention_keeps_newest(count in 1usize..25, max in 0usize..8) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let dir = tempfile::tempdir().unwrap();
            let store = storage(&dir, max).await;
            let chat = ChatId(5);
            for i in 0..count {
                store.append(chat, "t", Role::User, &i.to_string(), "assistant").await.unwrap();
            }

            let query = HistoryQuery { chat_id: chat, topic: Some("t".into()), limit: 1000 };
            let got: Vec<usize> = store
                .get_history(&query)
                .await
                .unwrap()
                .iter()
                .map(|m| m.content.parse().unwrap())
                .collect();
            let kept = count.min(max.max(1));
            let expected: Vec<usize> = (count - kept..count).collect();
            prop_assert_eq!(got, expected);
            Ok(())
        })?;
    }
}
