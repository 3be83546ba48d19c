use std::sync::Arc;

use rbacsync_application::{
    ChangeAction, ChangeSubject, DocumentKey, DocumentStore, GraphStore, InitOptions,
    RbacAdminService,
};
use rbacsync_core::AppError;
use rbacsync_domain::{Assignment, Edge, Item, ItemInput, ItemType, Locale, Rule};

use crate::{InMemoryDocumentStore, StaticPermissionDiscovery, parse_sync_definition};

use super::InMemoryGraphStore;

fn item(name: &str, item_type: ItemType, rule_name: Option<&str>) -> Item {
    Item::new(ItemInput {
        name: name.to_owned(),
        item_type,
        description: None,
        rule_name: rule_name.map(str::to_owned),
        data: None,
        system: false,
        category: None,
    })
    .unwrap_or_else(|_| unreachable!())
}

fn edge(parent: &str, child: &str) -> Edge {
    Edge::new(parent, child).unwrap_or_else(|_| unreachable!())
}

#[tokio::test]
async fn item_names_are_unique_across_types() {
    let store = InMemoryGraphStore::new();
    let mut transaction = store.begin().await.unwrap_or_else(|_| unreachable!());

    assert!(
        transaction
            .insert_item(&item("admin", ItemType::Role, None))
            .await
            .is_ok()
    );
    let duplicate = transaction
        .insert_item(&item("admin", ItemType::Permission, None))
        .await;
    assert!(matches!(
        duplicate,
        Err(AppError::ConstraintViolation { ref entity, ref field, .. })
            if entity == "item" && field == "name"
    ));
}

#[tokio::test]
async fn references_must_exist() {
    let store = InMemoryGraphStore::new();
    let mut transaction = store.begin().await.unwrap_or_else(|_| unreachable!());

    let unknown_rule = transaction
        .insert_item(&item("owner", ItemType::Role, Some("isOwner")))
        .await;
    assert!(matches!(
        unknown_rule,
        Err(AppError::ConstraintViolation { ref field, .. }) if field == "rule_name"
    ));

    assert!(
        transaction
            .insert_rule(&Rule::new("isOwner", None).unwrap_or_else(|_| unreachable!()))
            .await
            .is_ok()
    );
    assert!(
        transaction
            .insert_item(&item("owner", ItemType::Role, Some("isOwner")))
            .await
            .is_ok()
    );

    let dangling_edge = transaction.insert_edge(&edge("owner", "UserEdit")).await;
    assert!(matches!(
        dangling_edge,
        Err(AppError::ConstraintViolation { ref field, .. }) if field == "child"
    ));

    assert!(
        transaction
            .insert_item(&item("UserEdit", ItemType::Permission, None))
            .await
            .is_ok()
    );
    let assignment = Assignment::new("admin", "UserEdit").unwrap_or_else(|_| unreachable!());
    let permission_assignment = transaction.insert_assignment(&assignment).await;
    assert!(matches!(
        permission_assignment,
        Err(AppError::ConstraintViolation { ref field, .. }) if field == "item_name"
    ));
}

#[tokio::test]
async fn deleting_items_cascades_and_drop_discards_writes() {
    let store = InMemoryGraphStore::new();
    let mut transaction = store.begin().await.unwrap_or_else(|_| unreachable!());
    for (name, item_type) in [("admin", ItemType::Role), ("UserEdit", ItemType::Permission)] {
        assert!(
            transaction
                .insert_item(&item(name, item_type, None))
                .await
                .is_ok()
        );
    }
    assert!(transaction.insert_edge(&edge("admin", "UserEdit")).await.is_ok());
    let assignment = Assignment::new("admin", "admin").unwrap_or_else(|_| unreachable!());
    assert!(transaction.insert_assignment(&assignment).await.is_ok());
    assert!(transaction.commit().await.is_ok());

    let mut transaction = store.begin().await.unwrap_or_else(|_| unreachable!());
    assert!(matches!(
        transaction.delete_item(ItemType::Permission, "admin").await,
        Ok(false)
    ));
    assert!(matches!(
        transaction.delete_item(ItemType::Role, "admin").await,
        Ok(true)
    ));
    assert!(matches!(transaction.list_edges().await, Ok(edges) if edges.is_empty()));
    assert!(matches!(
        transaction.list_assignments().await,
        Ok(assignments) if assignments.is_empty()
    ));
    drop(transaction);

    let snapshot = store.snapshot().await.unwrap_or_default();
    assert_eq!(snapshot.items.len(), 2);
    assert_eq!(snapshot.edges, vec![edge("admin", "UserEdit")]);
}

#[tokio::test]
async fn orphan_sweep_keeps_role_to_permission_edges_only() {
    let store = InMemoryGraphStore::new();
    let mut transaction = store.begin().await.unwrap_or_else(|_| unreachable!());
    for (name, item_type) in [
        ("admin", ItemType::Role),
        ("manager", ItemType::Role),
        ("UserEdit", ItemType::Permission),
    ] {
        assert!(
            transaction
                .insert_item(&item(name, item_type, None))
                .await
                .is_ok()
        );
    }
    for (parent, child) in [("admin", "manager"), ("admin", "UserEdit")] {
        assert!(transaction.insert_edge(&edge(parent, child)).await.is_ok());
    }

    let removed = transaction
        .delete_orphan_edges(
            &["admin".to_owned(), "manager".to_owned()],
            &["UserEdit".to_owned()],
        )
        .await;
    assert!(matches!(removed, Ok(edges) if edges == vec![edge("admin", "manager")]));
    assert!(matches!(
        transaction.list_edges().await,
        Ok(edges) if edges == vec![edge("admin", "UserEdit")]
    ));
}

#[tokio::test]
async fn updates_keep_item_type_and_reject_duplicate_edges_and_rules() {
    let store = InMemoryGraphStore::new();
    let mut transaction = store.begin().await.unwrap_or_else(|_| unreachable!());
    for (name, item_type) in [("admin", ItemType::Role), ("UserEdit", ItemType::Permission)] {
        assert!(
            transaction
                .insert_item(&item(name, item_type, None))
                .await
                .is_ok()
        );
    }

    let retyped = transaction
        .update_item(&item("UserEdit", ItemType::Role, None))
        .await;
    assert!(matches!(
        retyped,
        Err(AppError::ConstraintViolation { ref field, .. }) if field == "type"
    ));

    assert!(transaction.insert_edge(&edge("admin", "UserEdit")).await.is_ok());
    let duplicate_edge = transaction.insert_edge(&edge("admin", "UserEdit")).await;
    assert!(matches!(
        duplicate_edge,
        Err(AppError::ConstraintViolation { ref entity, .. }) if entity == "item_child"
    ));

    let rule = Rule::new("isOwner", Some("v1".to_owned())).unwrap_or_else(|_| unreachable!());
    assert!(transaction.insert_rule(&rule).await.is_ok());
    let duplicate_rule = transaction.insert_rule(&rule).await;
    assert!(matches!(
        duplicate_rule,
        Err(AppError::ConstraintViolation { ref entity, .. }) if entity == "rule"
    ));

    let mut updated = rule.clone();
    updated.set_data(Some("v2".to_owned()));
    assert!(transaction.update_rule(&updated).await.is_ok());
    let rules = transaction.list_rules().await.unwrap_or_default();
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].data(), Some("v2"));
}

fn service(
    graph: Arc<InMemoryGraphStore>,
    documents: Arc<InMemoryDocumentStore>,
) -> RbacAdminService {
    let discovery = StaticPermissionDiscovery::from_json(
        r#"{"controllers": {"UserController": ["actionEdit", "actionView"], "Report": ["Print"]}}"#,
    )
    .unwrap_or_else(|_| unreachable!());

    RbacAdminService::new(graph, documents, Arc::new(discovery), "admin")
}

const DEFINITION: &str = r#"{
    "roles": [
        {"name": "admin", "description": "Administrator", "system": true},
        {"name": "manager", "description": "Manager", "system": true}
    ],
    "specialPermissions": [
        {"name": "ReportArchive", "description": "Archive reports", "category": "Report"}
    ],
    "permissions": {
        "manager": {"user": ["view"], "report": "all"}
    }
}"#;

#[tokio::test]
async fn init_export_import_cycle_is_stable() {
    let graph = Arc::new(InMemoryGraphStore::new());
    let documents = Arc::new(InMemoryDocumentStore::new());
    let service = service(graph.clone(), documents.clone());
    let definition = parse_sync_definition(DEFINITION).unwrap_or_default();
    let english = Locale::from_language("en-US").unwrap_or_else(|_| unreachable!());

    let first = service
        .init(InitOptions {
            definition: definition.clone(),
            ..InitOptions::default()
        })
        .await;
    assert!(first.is_ok());
    let first = first.unwrap_or_default();
    assert_eq!(first.count(ChangeAction::Created, ChangeSubject::Permission), 4);
    assert_eq!(first.count(ChangeAction::Created, ChangeSubject::Edge), 7);
    assert!(first.warnings().is_empty());

    let second = service
        .init(InitOptions {
            definition,
            ..InitOptions::default()
        })
        .await
        .unwrap_or_default();
    assert!(second.is_noop());

    let export = service.export(&[english.clone()]).await;
    assert!(export.is_ok());
    let before = graph.snapshot().await.unwrap_or_default();

    let import = service.import(&english).await;
    assert!(import.is_ok());
    let after = graph.snapshot().await.unwrap_or_default();

    assert_eq!(before.edges, after.edges);
    let describe = |items: &[Item]| {
        items
            .iter()
            .map(|item| (item.name().to_owned(), item.description().map(str::to_owned)))
            .collect::<Vec<_>>()
    };
    assert_eq!(describe(&before.items), describe(&after.items));
}

#[tokio::test]
async fn import_keeps_absent_non_system_roles() {
    let graph = Arc::new(InMemoryGraphStore::new());
    let documents = Arc::new(InMemoryDocumentStore::new());
    let service = service(graph.clone(), documents.clone());
    let english = Locale::new("en").unwrap_or_else(|_| unreachable!());

    assert!(
        service
            .init(InitOptions {
                definition: parse_sync_definition(DEFINITION).unwrap_or_default(),
                ..InitOptions::default()
            })
            .await
            .is_ok()
    );
    assert!(service.export(&[english.clone()]).await.is_ok());

    let mut transaction = graph.begin().await.unwrap_or_else(|_| unreachable!());
    assert!(
        transaction
            .insert_item(&item("auditor", ItemType::Role, None))
            .await
            .is_ok()
    );
    let mut protected = item("legacy", ItemType::Role, None);
    protected.set_system(true);
    assert!(transaction.insert_item(&protected).await.is_ok());
    assert!(transaction.commit().await.is_ok());

    let report = service.import(&english).await.unwrap_or_default();
    assert_eq!(report.count(ChangeAction::Removed, ChangeSubject::Role), 1);

    let roles = graph
        .snapshot()
        .await
        .unwrap_or_default()
        .items
        .into_iter()
        .filter(Item::is_role)
        .map(|role| role.name().to_owned())
        .collect::<Vec<_>>();
    assert_eq!(roles, vec!["admin", "auditor", "manager"]);

    assert!(
        documents
            .load(&DocumentKey::Permissions(english))
            .await
            .is_ok_and(|document| document.is_some())
    );
}
