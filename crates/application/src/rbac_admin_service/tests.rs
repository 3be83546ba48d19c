use std::sync::Arc;

use serde_json::json;

use rbacsync_core::AppError;
use rbacsync_domain::{DiscoveredPermission, ItemType, Locale, Rule};

use crate::change_report::{ChangeAction, ChangeSubject};
use crate::document_ports::DocumentKey;
use crate::graph_ports::GraphStore;
use crate::reconciler::SyncDefinition;
use crate::test_support::{
    FakeDiscovery, FakeDocumentStore, FakeGraph, FakeGraphStore, document_of, edge, graph_of,
    permission, role,
};

use super::{InitOptions, RbacAdminService};

fn locale() -> Locale {
    Locale::new("en").unwrap_or_else(|_| unreachable!())
}

fn definition() -> SyncDefinition {
    serde_json::from_value(json!({
        "roles": [
            {"name": "admin", "description": "Administrator", "system": true},
            {"name": "manager", "description": "Manager", "system": false}
        ],
        "permissions": {"manager": {"user": ["view"]}}
    }))
    .unwrap_or_else(|_| unreachable!())
}

fn service(graph: FakeGraphStore, documents: Arc<FakeDocumentStore>) -> RbacAdminService {
    RbacAdminService::new(
        Arc::new(graph),
        documents,
        Arc::new(FakeDiscovery {
            permissions: vec![
                DiscoveredPermission::from_action("User", "Edit"),
                DiscoveredPermission::from_action("User", "View"),
            ],
        }),
        "admin",
    )
}

#[tokio::test]
async fn init_synchronizes_discovered_permissions_and_mappings() {
    let graph = FakeGraphStore::default();
    let service = service(graph.clone(), Arc::new(FakeDocumentStore::default()));

    let report = service
        .init(InitOptions {
            definition: definition(),
            ..InitOptions::default()
        })
        .await;
    assert!(report.is_ok());
    let report = report.unwrap_or_else(|_| unreachable!());
    assert_eq!(report.count(ChangeAction::Created, ChangeSubject::Role), 2);
    assert_eq!(report.count(ChangeAction::Created, ChangeSubject::Edge), 3);

    let stored = graph.graph().await;
    assert_eq!(
        stored.edge_pairs(),
        vec![
            ("admin".to_owned(), "UserEdit".to_owned()),
            ("admin".to_owned(), "UserView".to_owned()),
            ("manager".to_owned(), "UserView".to_owned()),
        ]
    );
}

#[tokio::test]
async fn init_with_reset_starts_from_an_empty_graph() {
    let graph = FakeGraphStore::with_graph(graph_of(
        vec![
            role("admin", true),
            permission("UserEdit", "User", "Upravit uzivatele"),
        ],
        Vec::new(),
    ));
    let service = service(graph.clone(), Arc::new(FakeDocumentStore::default()));

    let result = service
        .init(InitOptions {
            definition: definition(),
            reset: true,
            delete_obsolete_permissions: false,
        })
        .await;
    assert!(result.is_ok());

    let stored = graph.graph().await;
    assert_eq!(
        stored.items.get("UserEdit").and_then(|item| item.description()),
        Some("Allow to edit the User.")
    );
}

#[tokio::test]
async fn export_then_import_keeps_curated_descriptions() {
    let graph = FakeGraphStore::default();
    let documents = Arc::new(FakeDocumentStore::default());
    let service = service(graph.clone(), documents.clone());

    assert!(
        service
            .init(InitOptions {
                definition: definition(),
                ..InitOptions::default()
            })
            .await
            .is_ok()
    );
    documents
        .put(
            DocumentKey::Permissions(locale()),
            document_of(json!([{"name": "UserEdit", "description": "Edit any user"}])),
        )
        .await;

    assert!(service.export(&[locale()]).await.is_ok());
    let report = service.import(&locale()).await;
    assert!(report.is_ok());

    let stored = graph.graph().await;
    assert_eq!(
        stored.items.get("UserEdit").and_then(|item| item.description()),
        Some("Edit any user")
    );
    assert_eq!(
        stored.items.get("UserView").and_then(|item| item.description()),
        Some("Allow to view the User.")
    );
    assert_eq!(stored.edges.len(), 3);
    assert_eq!(stored.assignments.len(), 1);
}

async fn seed_documents(documents: &FakeDocumentStore, roles: serde_json::Value) {
    documents
        .put(DocumentKey::Roles(locale()), document_of(roles))
        .await;
    documents
        .put(
            DocumentKey::Permissions(locale()),
            document_of(json!([
                {"name": "UserEdit", "category": "User", "description": "Edit"},
                {"name": "UserView", "category": "User", "description": "View"}
            ])),
        )
        .await;
    documents
        .put(
            DocumentKey::ItemChildren,
            document_of(json!([
                {"parent": "admin", "child": "UserEdit"},
                {"parent": "UserEdit", "child": "UserView"}
            ])),
        )
        .await;
    documents
        .put(
            DocumentKey::Rules,
            document_of(json!([{"name": "isOwner", "data": "owner-rule"}])),
        )
        .await;
}

#[tokio::test]
async fn import_removes_only_absent_system_roles_and_sweeps_orphans() {
    let graph = FakeGraphStore::with_graph(graph_of(
        vec![
            role("admin", true),
            role("editor", true),
            role("viewer", false),
            permission("ReportPrint", "Report", "Print"),
        ],
        vec![edge("viewer", "ReportPrint")],
    ));
    let documents = Arc::new(FakeDocumentStore::default());
    seed_documents(
        &documents,
        json!([{"name": "admin", "type": "role", "description": "Administrator", "system": true}]),
    )
    .await;

    let report = service(graph.clone(), documents).import(&locale()).await;
    assert!(report.is_ok());
    let report = report.unwrap_or_else(|_| unreachable!());
    assert_eq!(report.count(ChangeAction::Removed, ChangeSubject::Role), 1);
    assert_eq!(report.count(ChangeAction::Skipped, ChangeSubject::Role), 1);

    let stored = graph.graph().await;
    assert_eq!(
        stored.item_names(ItemType::Role),
        vec!["admin".to_owned(), "viewer".to_owned()]
    );
    assert_eq!(
        stored.item_names(ItemType::Permission),
        vec!["UserEdit".to_owned(), "UserView".to_owned()]
    );
    assert_eq!(
        stored.edge_pairs(),
        vec![("admin".to_owned(), "UserEdit".to_owned())]
    );
    assert_eq!(
        stored.rules.get("isOwner").and_then(Rule::data),
        Some("owner-rule")
    );
    assert_eq!(stored.assignments.len(), 1);
}

#[tokio::test]
async fn import_applies_rules_before_items_that_reference_them() {
    let graph = FakeGraphStore::default();
    let documents = Arc::new(FakeDocumentStore::default());
    seed_documents(
        &documents,
        json!([
            {"name": "admin", "description": "Administrator", "system": true},
            {"name": "owner", "description": "Owner", "system": false, "rule_name": "isOwner"}
        ]),
    )
    .await;

    let report = service(graph.clone(), documents)
        .import(&locale())
        .await
        .unwrap_or_else(|_| unreachable!());
    let rule_position = report
        .changes()
        .iter()
        .position(|change| change.subject == ChangeSubject::Rule);
    let role_position = report
        .changes()
        .iter()
        .position(|change| change.subject == ChangeSubject::Role);
    assert!(rule_position < role_position);

    let stored = graph.graph().await;
    assert_eq!(
        stored.items.get("owner").and_then(|item| item.rule_name()),
        Some("isOwner")
    );
}

#[tokio::test]
async fn import_with_missing_document_changes_nothing() {
    let seeded = graph_of(vec![role("admin", true)], Vec::new());
    let graph = FakeGraphStore::with_graph(seeded.clone());
    let documents = Arc::new(FakeDocumentStore::default());
    documents
        .put(
            DocumentKey::Roles(locale()),
            document_of(json!([{"name": "admin", "system": true}])),
        )
        .await;

    let result = service(graph.clone(), documents).import(&locale()).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
    assert_eq!(graph.graph().await.items, seeded.items);
}

#[tokio::test]
async fn import_rejects_permission_inside_roles_document() {
    let graph = FakeGraphStore::with_graph(FakeGraph::default());
    let documents = Arc::new(FakeDocumentStore::default());
    seed_documents(
        &documents,
        json!([{"name": "UserEdit", "type": "permission", "description": "Edit"}]),
    )
    .await;

    let result = service(graph.clone(), documents).import(&locale()).await;
    assert!(matches!(
        result,
        Err(AppError::MalformedDocument { ref document, .. }) if document == "auth-roles.en"
    ));
    assert!(graph.graph().await.items.is_empty());
}

#[tokio::test]
async fn import_refuses_to_retype_an_existing_item() {
    let graph = FakeGraphStore::with_graph(graph_of(
        vec![role("admin", true), role("UserEdit", false)],
        Vec::new(),
    ));
    let documents = Arc::new(FakeDocumentStore::default());
    seed_documents(
        &documents,
        json!([
            {"name": "admin", "description": "Administrator", "system": true},
            {"name": "UserEdit", "description": "Role with a permission name", "system": false}
        ]),
    )
    .await;

    let result = service(graph.clone(), documents).import(&locale()).await;
    assert!(matches!(
        result,
        Err(AppError::ConstraintViolation { ref field, .. }) if field == "type"
    ));
}

#[tokio::test]
async fn import_overwrites_existing_rule_payload() {
    let mut seeded = graph_of(vec![role("admin", true)], Vec::new());
    let stale = Rule::new("isOwner", Some("stale-rule".to_owned()))
        .unwrap_or_else(|_| unreachable!());
    seeded.rules.insert(stale.name().to_owned(), stale);
    let graph = FakeGraphStore::with_graph(seeded);
    let documents = Arc::new(FakeDocumentStore::default());
    seed_documents(
        &documents,
        json!([{"name": "admin", "description": "Administrator", "system": true}]),
    )
    .await;

    let report = service(graph.clone(), documents).import(&locale()).await;
    assert!(report.is_ok());
    let report = report.unwrap_or_else(|_| unreachable!());
    assert_eq!(report.count(ChangeAction::Updated, ChangeSubject::Rule), 1);
    assert_eq!(report.count(ChangeAction::Created, ChangeSubject::Rule), 0);

    let mut transaction = graph.begin().await.unwrap_or_else(|_| unreachable!());
    let rules = transaction.list_rules().await.unwrap_or_default();
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].name(), "isOwner");
    assert_eq!(rules[0].data(), Some("owner-rule"));
}
