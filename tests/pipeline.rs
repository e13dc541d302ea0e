//! End-to-end pipeline tests: ingest a markdown tree into SQLite, then
//! exercise retrieval, category filtering, FAQ short-circuit, and the
//! member roster sync.

use std::path::Path;
use std::sync::Arc;

use clubkb::answer::AnswerService;
use clubkb::config::{ChunkingConfig, EmbeddingConfig, SourceConfig};
use clubkb::db;
use clubkb::embedding::Embedder;
use clubkb::ingest::Ingestor;
use clubkb::members::MemberRecord;
use clubkb::migrate;
use clubkb::models::RagQuery;
use clubkb::search::SearchEngine;
use clubkb::store::{KnowledgeStore, SqliteStore};

struct Harness {
    store: Arc<dyn KnowledgeStore>,
    ingestor: Ingestor,
    search: SearchEngine,
}

async fn harness(source_root: &Path, db_path: &Path) -> Harness {
    let pool = db::connect(db_path).await.unwrap();
    migrate::run_migrations(&pool).await.unwrap();

    let store: Arc<dyn KnowledgeStore> = Arc::new(SqliteStore::new(pool));
    let embedder = Arc::new(Embedder::new(&EmbeddingConfig::default()).unwrap());

    let source = SourceConfig {
        root: source_root.to_path_buf(),
        include_globs: vec!["**/*.md".to_string()],
        exclude_globs: vec![],
    };
    let ingestor = Ingestor::new(
        store.clone(),
        embedder.clone(),
        source,
        ChunkingConfig::default(),
    );
    let search = SearchEngine::new(store.clone(), embedder);

    Harness {
        store,
        ingestor,
        search,
    }
}

fn write_knowledge_files(root: &Path) {
    std::fs::write(
        root.join("mad.md"),
        "# MAD剪辑入门\n\n学习mad视频剪辑的制作，需要掌握节奏与素材的配合。\n",
    )
    .unwrap();
    std::fs::write(
        root.join("mmd.md"),
        "# MMD模型使用\n\nmmd模型导入后先检查贴图路径，再调整骨骼与物理。\n",
    )
    .unwrap();
}

#[tokio::test]
async fn test_ingestion_is_idempotent() {
    let source = tempfile::tempdir().unwrap();
    let dbdir = tempfile::tempdir().unwrap();
    write_knowledge_files(source.path());

    let h = harness(source.path(), &dbdir.path().join("kb.db")).await;

    let first = h.ingestor.load_all().await.unwrap();
    assert_eq!(first.processed, 2);
    assert_eq!(first.skipped, 0);
    let counts = h.store.counts().await.unwrap();
    assert_eq!(counts.0, 2);
    assert!(counts.1 >= 2);

    let second = h.ingestor.load_all().await.unwrap();
    assert_eq!(second.processed, 0);
    assert_eq!(second.skipped, 2);
    assert_eq!(h.store.counts().await.unwrap(), counts);

    let third = h.ingestor.refresh().await.unwrap();
    assert_eq!(third.processed, 0);
    assert_eq!(third.skipped, 2);
    assert_eq!(h.store.counts().await.unwrap(), counts);
}

#[tokio::test]
async fn test_changed_file_replaces_old_chunks() {
    let source = tempfile::tempdir().unwrap();
    let dbdir = tempfile::tempdir().unwrap();
    write_knowledge_files(source.path());

    let h = harness(source.path(), &dbdir.path().join("kb.db")).await;
    h.ingestor.refresh().await.unwrap();

    let before: Vec<String> = h
        .store
        .find_chunks(None)
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.chunk_id)
        .collect();

    std::fs::write(
        source.path().join("mad.md"),
        "# MAD剪辑进阶\n\n进阶的mad剪辑要研究特效与转场，建立自己的素材库。\n",
    )
    .unwrap();

    let summary = h.ingestor.refresh().await.unwrap();
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.skipped, 1);

    let after = h.store.find_chunks(None).await.unwrap();
    let mad: Vec<_> = after.iter().filter(|c| c.content.contains("进阶")).collect();
    assert!(!mad.is_empty());
    for chunk in &mad {
        assert!(!before.contains(&chunk.chunk_id));
    }
    assert_eq!(h.store.counts().await.unwrap().0, 2);
}

#[tokio::test]
async fn test_refresh_skips_via_in_process_state() {
    let source = tempfile::tempdir().unwrap();
    let dbdir = tempfile::tempdir().unwrap();
    write_knowledge_files(source.path());

    let h = harness(source.path(), &dbdir.path().join("kb.db")).await;
    h.ingestor.refresh().await.unwrap();

    // Drop one document behind the ingestor's back. The incremental pass
    // trusts its own fingerprint state and does not notice; a full load
    // falls back to the store check and repairs it.
    h.store.remove_document("mad.md").await.unwrap();

    let incremental = h.ingestor.refresh().await.unwrap();
    assert_eq!(incremental.processed, 0);
    assert_eq!(incremental.skipped, 2);
    assert_eq!(h.store.counts().await.unwrap().0, 1);

    let full = h.ingestor.load_all().await.unwrap();
    assert_eq!(full.processed, 1);
    assert_eq!(full.skipped, 1);
    assert_eq!(h.store.counts().await.unwrap().0, 2);
}

#[tokio::test]
async fn test_removed_file_is_dropped() {
    let source = tempfile::tempdir().unwrap();
    let dbdir = tempfile::tempdir().unwrap();
    write_knowledge_files(source.path());

    let h = harness(source.path(), &dbdir.path().join("kb.db")).await;
    h.ingestor.refresh().await.unwrap();

    std::fs::remove_file(source.path().join("mmd.md")).unwrap();
    let summary = h.ingestor.refresh().await.unwrap();
    assert_eq!(summary.removed, 1);

    let paths = h.store.list_source_paths().await.unwrap();
    assert_eq!(paths, vec!["mad.md".to_string()]);
}

#[tokio::test]
async fn test_search_ranks_matching_topic_first() {
    let source = tempfile::tempdir().unwrap();
    let dbdir = tempfile::tempdir().unwrap();
    write_knowledge_files(source.path());

    let h = harness(source.path(), &dbdir.path().join("kb.db")).await;
    h.ingestor.refresh().await.unwrap();

    let hits = h.search.search("如何制作MAD视频", 1, None).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert!(hits[0].content.contains("mad"));

    let hits = h.search.search("mmd模型贴图问题", 1, None).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert!(hits[0].content.contains("mmd"));
}

#[tokio::test]
async fn test_top_k_truncation_and_order() {
    let source = tempfile::tempdir().unwrap();
    let dbdir = tempfile::tempdir().unwrap();
    write_knowledge_files(source.path());
    std::fs::write(
        source.path().join("club.md"),
        "# 社团活动\n\n本学期的社团活动安排与比赛信息在此公布。\n",
    )
    .unwrap();

    let h = harness(source.path(), &dbdir.path().join("kb.db")).await;
    h.ingestor.refresh().await.unwrap();
    let total_chunks = h.store.counts().await.unwrap().1 as usize;

    // top_k far above the corpus size returns everything available.
    let hits = h.search.search("如何制作MAD视频", 50, None).await.unwrap();
    assert_eq!(hits.len(), total_chunks);
    for pair in hits.windows(2) {
        assert!(
            pair[0].similarity >= pair[1].similarity,
            "similarity increased: {} < {}",
            pair[0].similarity,
            pair[1].similarity
        );
    }

    let hits = h.search.search("如何制作MAD视频", 2, None).await.unwrap();
    assert_eq!(hits.len(), 2);
    assert!(hits[0].similarity >= hits[1].similarity);
}

#[tokio::test]
async fn test_search_category_filter() {
    let source = tempfile::tempdir().unwrap();
    let dbdir = tempfile::tempdir().unwrap();
    write_knowledge_files(source.path());

    let h = harness(source.path(), &dbdir.path().join("kb.db")).await;
    h.ingestor.refresh().await.unwrap();

    let hits = h.search.search("贴图", 10, Some("MMD创作")).await.unwrap();
    assert!(!hits.is_empty());
    assert!(hits.iter().all(|hit| hit.category == "MMD创作"));
}

#[tokio::test]
async fn test_faq_exact_match_bypasses_retrieval() {
    let source = tempfile::tempdir().unwrap();
    let dbdir = tempfile::tempdir().unwrap();
    write_knowledge_files(source.path());

    let h = harness(source.path(), &dbdir.path().join("kb.db")).await;
    h.ingestor.refresh().await.unwrap();

    let answers = AnswerService::new(Arc::new(h.search));
    let response = answers
        .answer(&RagQuery {
            query: "你是谁？".to_string(),
            top_k: 5,
            category: None,
        })
        .await
        .unwrap();

    assert!(response.relevant_chunks.is_empty());
    assert!(response.enhanced_query.starts_with("【FAQ精确匹配】"));
}

#[tokio::test]
async fn test_empty_query_is_rejected() {
    let source = tempfile::tempdir().unwrap();
    let dbdir = tempfile::tempdir().unwrap();
    write_knowledge_files(source.path());

    let h = harness(source.path(), &dbdir.path().join("kb.db")).await;
    let answers = AnswerService::new(Arc::new(h.search));
    let err = answers
        .answer(&RagQuery {
            query: "   ".to_string(),
            top_k: 5,
            category: None,
        })
        .await
        .unwrap_err();

    assert!(err.to_string().contains("must not be empty"));
}

#[tokio::test]
async fn test_members_sync_materializes_roster() {
    let source = tempfile::tempdir().unwrap();
    let dbdir = tempfile::tempdir().unwrap();
    write_knowledge_files(source.path());

    let h = harness(source.path(), &dbdir.path().join("kb.db")).await;
    h.ingestor.refresh().await.unwrap();

    let members = vec![MemberRecord {
        name: "小明".to_string(),
        sex: "男".to_string(),
        year: "2024".to_string(),
        direction: "MAD".to_string(),
        position: "组员".to_string(),
        status: "在役".to_string(),
        remark: String::new(),
    }];
    h.ingestor.sync_members(&members).await.unwrap();

    assert!(source.path().join("社团成员信息.md").exists());
    assert_eq!(h.store.counts().await.unwrap().0, 3);

    let paths = h.store.list_source_paths().await.unwrap();
    assert!(paths.contains(&"社团成员信息.md".to_string()));
}
