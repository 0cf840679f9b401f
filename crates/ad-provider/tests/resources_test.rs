//! Resource lifecycles against the in-memory directory.

mod common;

use ad_connector::operation::Uid;
use ad_connector::traits::RenameOp;
use ad_provider::{PlanAction, ProviderError, ProviderService};
use common::{provider, COMPUTERS_DN, DOMAIN_DN, USERS_DN};
use serde_json::{json, Value};

/// Plan a create and apply it.
async fn create(provider: &impl ProviderService, resource_type: &str, config: Value) -> Value {
    let plan = provider.plan(resource_type, None, config).await.unwrap();
    assert_eq!(plan.action, PlanAction::Create);
    provider
        .create(resource_type, plan.planned_state)
        .await
        .unwrap()
}

/// Plan an update from `state` to `config` and apply it.
async fn update(
    provider: &impl ProviderService,
    resource_type: &str,
    state: &Value,
    config: Value,
) -> Value {
    let plan = provider
        .plan(resource_type, Some(state.clone()), config)
        .await
        .unwrap();
    assert_eq!(plan.action, PlanAction::Update, "{:?}", plan.changes);
    provider
        .update(resource_type, state.clone(), plan.planned_state)
        .await
        .unwrap()
}

// --- ad_group ---

#[tokio::test]
async fn test_group_create_reads_guid_and_dn() {
    let (provider, directory) = provider(true);
    let state = create(
        &provider,
        "ad_group",
        json!({"name": "Admins", "domain": "example.com", "description": "Administrators"}),
    )
    .await;

    let dn = format!("cn=Admins,{USERS_DN}");
    assert_eq!(state["dn"], json!(dn));
    assert_eq!(state["id"], json!(directory.guid(&dn).unwrap()));
    assert_eq!(state["type"], json!("GLOBAL"));
    assert_eq!(state["description"], json!("Administrators"));
    assert_eq!(directory.values(&dn, "groupType"), vec!["-2147483646"]);
    assert_eq!(directory.values(&dn, "sAMAccountName"), vec!["Admins"]);
}

#[tokio::test]
async fn test_group_local_type_and_initial_members() {
    let (provider, directory) = provider(true);
    let alice = directory.seed_user("alice", "Alice", "Liddell", USERS_DN);

    let state = create(
        &provider,
        "ad_group",
        json!({
            "name": "Printers",
            "domain": "example.com",
            "type": "LOCAL",
            "members": [alice]
        }),
    )
    .await;

    let dn = format!("cn=Printers,{USERS_DN}");
    assert_eq!(directory.values(&dn, "groupType"), vec!["-2147483644"]);
    assert_eq!(directory.values(&dn, "member"), vec![alice.clone()]);
    assert_eq!(state["members"], json!([alice]));
}

#[tokio::test]
async fn test_group_plan_after_create_is_noop() {
    let (provider, _directory) = provider(true);
    let config = json!({"name": "Admins", "domain": "example.com"});
    let state = create(&provider, "ad_group", config.clone()).await;

    let plan = provider
        .plan("ad_group", Some(state), config)
        .await
        .unwrap();
    assert_eq!(plan.action, PlanAction::NoOp, "{:?}", plan.changes);
}

#[tokio::test]
async fn test_group_type_change_forces_replacement() {
    let (provider, _directory) = provider(true);
    let state = create(
        &provider,
        "ad_group",
        json!({"name": "Admins", "domain": "example.com"}),
    )
    .await;

    let plan = provider
        .plan(
            "ad_group",
            Some(state),
            json!({"name": "Admins", "domain": "example.com", "type": "LOCAL"}),
        )
        .await
        .unwrap();
    assert_eq!(plan.action, PlanAction::Replace);
}

#[tokio::test]
async fn test_group_update_rename_description_and_members() {
    let (provider, directory) = provider(true);
    let alice = directory.seed_user("alice", "Alice", "Liddell", USERS_DN);
    let bob = directory.seed_user("bob", "Bob", "Builder", USERS_DN);

    let state = create(
        &provider,
        "ad_group",
        json!({
            "name": "Admins",
            "domain": "example.com",
            "description": "Administrators",
            "members": [alice]
        }),
    )
    .await;
    let guid = state["id"].clone();

    let state = update(
        &provider,
        "ad_group",
        &state,
        json!({
            "name": "Operators",
            "domain": "example.com",
            "description": "",
            "members": [bob]
        }),
    )
    .await;

    let dn = format!("cn=Operators,{USERS_DN}");
    assert_eq!(state["id"], guid);
    assert_eq!(state["dn"], json!(dn));
    assert_eq!(state["name"], json!("Operators"));
    assert!(!directory.exists(&format!("cn=Admins,{USERS_DN}")));
    assert_eq!(directory.values(&dn, "sAMAccountName"), vec!["Operators"]);
    assert!(directory.values(&dn, "description").is_empty());
    assert_eq!(directory.values(&dn, "member"), vec![bob]);
}

#[tokio::test]
async fn test_group_move_to_orgunit() {
    let (provider, directory) = provider(true);
    let groups_ou = format!("ou=Groups,{DOMAIN_DN}");
    directory.seed(&groups_ou, &[("objectClass", &["top", "organizationalUnit"])]);

    let state = create(
        &provider,
        "ad_group",
        json!({"name": "Admins", "domain": "example.com"}),
    )
    .await;

    let state = update(
        &provider,
        "ad_group",
        &state,
        json!({"name": "Admins", "domain": "example.com", "orgunit": groups_ou}),
    )
    .await;

    let dn = format!("cn=Admins,{groups_ou}");
    assert_eq!(state["dn"], json!(dn));
    assert!(directory.exists(&dn));
}

#[tokio::test]
async fn test_group_read_after_external_delete() {
    let (provider, directory) = provider(true);
    let state = create(
        &provider,
        "ad_group",
        json!({"name": "Admins", "domain": "example.com"}),
    )
    .await;

    directory.remove(&format!("cn=Admins,{USERS_DN}"));
    assert_eq!(provider.read("ad_group", state.clone()).await.unwrap(), None);
    provider.delete("ad_group", state).await.unwrap();
}

#[tokio::test]
async fn test_group_delete() {
    let (provider, directory) = provider(true);
    let state = create(
        &provider,
        "ad_group",
        json!({"name": "Admins", "domain": "example.com"}),
    )
    .await;

    provider.delete("ad_group", state.clone()).await.unwrap();
    assert!(!directory.exists(&format!("cn=Admins,{USERS_DN}")));

    // Already gone.
    provider.delete("ad_group", state).await.unwrap();
}

#[tokio::test]
async fn test_group_create_with_unknown_member_leaves_nothing_behind() {
    let (provider, directory) = provider(true);
    let ghost = format!("cn=Nobody,{USERS_DN}");
    let config = json!({"name": "Admins", "domain": "example.com", "members": [ghost]});

    let plan = provider.plan("ad_group", None, config).await.unwrap();
    let err = provider
        .create("ad_group", plan.planned_state)
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "OBJECT_NOT_FOUND");
    assert!(!directory.exists(&format!("cn=Admins,{USERS_DN}")));

    // A corrected retry starts clean instead of hitting an existing entry.
    let alice = directory.seed_user("alice", "Alice", "Liddell", USERS_DN);
    let state = create(
        &provider,
        "ad_group",
        json!({"name": "Admins", "domain": "example.com", "members": [alice]}),
    )
    .await;
    assert_eq!(state["members"], json!([alice]));
}

#[tokio::test]
async fn test_group_create_conflict() {
    let (provider, _directory) = provider(true);
    let config = json!({"name": "Admins", "domain": "example.com"});
    create(&provider, "ad_group", config.clone()).await;

    let plan = provider.plan("ad_group", None, config).await.unwrap();
    let err = provider
        .create("ad_group", plan.planned_state)
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "OBJECT_EXISTS");
}

// --- ad_computer ---

#[tokio::test]
async fn test_computer_create_default_container() {
    let (provider, directory) = provider(true);
    let state = create(
        &provider,
        "ad_computer",
        json!({"name": "web01", "domain": "example.com", "description": "Web server"}),
    )
    .await;

    let dn = format!("cn=web01,{COMPUTERS_DN}");
    assert_eq!(state["id"], json!(dn));
    assert_eq!(state["dn"], json!(dn));
    assert_eq!(directory.values(&dn, "sAMAccountName"), vec!["WEB01$"]);
    assert_eq!(directory.values(&dn, "userAccountControl"), vec!["4096"]);
    assert_eq!(
        directory.values(&dn, "objectClass"),
        vec!["top", "computer"]
    );
}

#[tokio::test]
async fn test_computer_orgunit_move_and_description_clear() {
    let (provider, directory) = provider(true);
    directory.seed(
        &format!("ou=Servers,{DOMAIN_DN}"),
        &[("objectClass", &["top", "organizationalUnit"])],
    );
    let servers = format!("ou=Computers,ou=Servers,{DOMAIN_DN}");
    directory.seed(&servers, &[("objectClass", &["top", "organizationalUnit"])]);

    let state = create(
        &provider,
        "ad_computer",
        json!({"name": "web01", "domain": "example.com", "description": "Web server"}),
    )
    .await;

    let state = update(
        &provider,
        "ad_computer",
        &state,
        json!({"name": "web01", "domain": "example.com", "orgunit": "Servers"}),
    )
    .await;

    let dn = format!("cn=web01,{servers}");
    assert_eq!(state["id"], json!(dn));
    assert_eq!(state["description"], json!(""));
    assert!(directory.values(&dn, "description").is_empty());
    assert!(!directory.exists(&format!("cn=web01,{COMPUTERS_DN}")));
}

#[tokio::test]
async fn test_computer_ambiguous_read() {
    let (provider, directory) = provider(true);
    let sub = format!("ou=Sub,{COMPUTERS_DN}");
    directory.seed(&sub, &[("objectClass", &["top", "organizationalUnit"])]);
    for parent in [COMPUTERS_DN, sub.as_str()] {
        directory.seed(
            &format!("cn=web01,{parent}"),
            &[("objectClass", &["top", "computer"])],
        );
    }

    let err = provider
        .read(
            "ad_computer",
            json!({"id": format!("cn=web01,{COMPUTERS_DN}"), "name": "web01", "domain": "example.com"}),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::Ambiguous { .. }));
    assert_eq!(err.to_string(), "found ambiguous values for computer: web01");
}

#[tokio::test]
async fn test_computer_missing_container_reads_as_gone() {
    let (provider, _directory) = provider(true);
    let state = provider
        .read(
            "ad_computer",
            json!({"id": "x", "name": "web01", "domain": "example.com", "orgunit": "Nowhere"}),
        )
        .await
        .unwrap();
    assert_eq!(state, None);
}

// --- ad_ou ---

#[tokio::test]
async fn test_orgunit_lifecycle() {
    let (provider, directory) = provider(true);
    let state = create(
        &provider,
        "ad_ou",
        json!({"name": "Engineering", "domain": "example.com", "description": "R&D"}),
    )
    .await;

    let dn = format!("ou=Engineering,{DOMAIN_DN}");
    assert_eq!(state["dn"], json!(dn));
    assert_eq!(state["id"], json!(directory.guid(&dn).unwrap()));
    assert_eq!(directory.values(&dn, "description"), vec!["R&D"]);

    let state = update(
        &provider,
        "ad_ou",
        &state,
        json!({"name": "Eng", "domain": "example.com", "description": "R&D"}),
    )
    .await;
    let renamed = format!("ou=Eng,{DOMAIN_DN}");
    assert_eq!(state["dn"], json!(renamed));
    assert_eq!(state["name"], json!("Eng"));

    provider.delete("ad_ou", state).await.unwrap();
    assert!(!directory.exists(&renamed));
}

#[tokio::test]
async fn test_orgunit_rename_moves_children() {
    let (provider, directory) = provider(true);
    let state = create(
        &provider,
        "ad_ou",
        json!({"name": "Engineering", "domain": "example.com"}),
    )
    .await;
    directory.seed_user("carol", "Carol", "Danvers", &format!("ou=Engineering,{DOMAIN_DN}"));

    update(
        &provider,
        "ad_ou",
        &state,
        json!({"name": "Eng", "domain": "example.com"}),
    )
    .await;

    assert!(directory.exists(&format!("cn=Carol Danvers,ou=Eng,{DOMAIN_DN}")));
}

#[tokio::test]
async fn test_orgunit_parent_move() {
    let (provider, directory) = provider(true);
    let parent = format!("ou=Departments,{DOMAIN_DN}");
    directory.seed(&parent, &[("objectClass", &["top", "organizationalUnit"])]);

    let state = create(
        &provider,
        "ad_ou",
        json!({"name": "Sales", "domain": "example.com"}),
    )
    .await;
    let state = update(
        &provider,
        "ad_ou",
        &state,
        json!({"name": "Sales", "domain": "example.com", "parent": parent}),
    )
    .await;

    assert_eq!(state["dn"], json!(format!("ou=Sales,{parent}")));
}

// --- ad_user ---

fn user_config() -> Value {
    json!({
        "username": "jsmith",
        "password": "S3cret!pass",
        "domain": "example.com",
        "firstname": "John",
        "lastname": "Smith",
        "description": "Operator"
    })
}

#[tokio::test]
async fn test_user_create_sets_password_and_activates() {
    let (provider, directory) = provider(true);
    let state = create(&provider, "ad_user", user_config()).await;

    let dn = format!("cn=John Smith,{USERS_DN}");
    assert_eq!(state["dn"], json!(dn));
    assert_eq!(state["id"], json!(directory.guid(&dn).unwrap()));
    assert_eq!(directory.values(&dn, "displayName"), vec!["John Smith"]);
    assert_eq!(directory.values(&dn, "sAMAccountName"), vec!["jsmith"]);
    assert_eq!(directory.values(&dn, "userAccountControl"), vec!["512"]);
    assert_eq!(directory.values(&dn, "unicodePwd").len(), 1);

    let ops = directory.operations();
    assert_eq!(ops[0], format!("add {dn}"));
    assert_eq!(ops[1], format!("modify {dn} [unicodePwd]"));
    assert_eq!(ops[2], format!("modify {dn} [userAccountControl]"));
}

#[tokio::test]
async fn test_user_create_requires_ssl() {
    let (provider, directory) = provider(false);
    let plan = provider.plan("ad_user", None, user_config()).await.unwrap();
    let err = provider
        .create("ad_user", plan.planned_state)
        .await
        .unwrap_err();

    assert_eq!(err.error_code(), "INVALID_CONFIG");
    assert!(directory.operations().is_empty());
}

#[tokio::test]
async fn test_user_update_description_and_password() {
    let (provider, directory) = provider(true);
    let state = create(&provider, "ad_user", user_config()).await;

    let mut config = user_config();
    config["description"] = json!("Senior operator");
    config["password"] = json!("N3w!pass");
    let state = update(&provider, "ad_user", &state, config).await;

    let dn = format!("cn=John Smith,{USERS_DN}");
    assert_eq!(state["description"], json!("Senior operator"));
    assert_eq!(directory.values(&dn, "description"), vec!["Senior operator"]);
    assert!(directory
        .operations()
        .iter()
        .skip(3)
        .any(|op| op == &format!("modify {dn} [unicodePwd]")));
}

#[tokio::test]
async fn test_user_delete_is_idempotent() {
    let (provider, directory) = provider(true);
    let state = create(&provider, "ad_user", user_config()).await;

    provider.delete("ad_user", state.clone()).await.unwrap();
    assert!(!directory.exists(&format!("cn=John Smith,{USERS_DN}")));
    provider.delete("ad_user", state).await.unwrap();
}

#[tokio::test]
async fn test_user_read_by_guid() {
    let (provider, directory) = provider(true);
    let dn = directory.seed_user("jsmith", "John", "Smith", USERS_DN);
    let guid = directory.guid(&dn).unwrap();

    let mut state = user_config();
    state["id"] = json!(guid);
    let state = provider.read("ad_user", state).await.unwrap().unwrap();

    assert_eq!(state["id"], json!(guid));
    assert_eq!(state["dn"], json!(dn));
    assert_eq!(state["description"], json!(""));
}

#[tokio::test]
async fn test_user_moved_outside_is_moved_back() {
    let (provider, directory) = provider(true);
    let staff = format!("ou=Staff,{DOMAIN_DN}");
    directory.seed(&staff, &[("objectClass", &["top", "organizationalUnit"])]);
    let state = create(&provider, "ad_user", user_config()).await;
    assert!(state.get("parent").and_then(Value::as_str).unwrap_or_default().is_empty());

    let dn = format!("cn=John Smith,{USERS_DN}");
    directory
        .rename(&Uid::from_dn(dn.as_str()), "cn=John Smith", Some(&staff))
        .await
        .unwrap();

    let state = provider.read("ad_user", state).await.unwrap().unwrap();
    assert_eq!(state["parent"], json!(staff));
    assert_eq!(state["dn"], json!(format!("cn=John Smith,{staff}")));

    let state = update(&provider, "ad_user", &state, user_config()).await;
    assert_eq!(state["dn"], json!(dn));
    assert!(directory.exists(&dn));

    let plan = provider
        .plan("ad_user", Some(state), user_config())
        .await
        .unwrap();
    assert_eq!(plan.action, PlanAction::NoOp, "{:?}", plan.changes);
}

// --- ad_user_attachment ---

#[tokio::test]
async fn test_user_attachment_lifecycle() {
    let (provider, directory) = provider(true);
    let group = format!("cn=Admins,{USERS_DN}");
    directory.seed(&group, &[("objectClass", &["top", "group"])]);
    let user = directory.seed_user("alice", "Alice", "Liddell", USERS_DN);

    let state = create(
        &provider,
        "ad_user_attachment",
        json!({"group_dn": group, "user_dn": user}),
    )
    .await;
    assert_eq!(state["id"].as_str().unwrap().len(), 36);
    assert_eq!(directory.values(&group, "member"), vec![user.clone()]);

    assert!(provider
        .read("ad_user_attachment", state.clone())
        .await
        .unwrap()
        .is_some());

    provider
        .delete("ad_user_attachment", state.clone())
        .await
        .unwrap();
    assert!(directory.values(&group, "member").is_empty());
    assert_eq!(
        provider.read("ad_user_attachment", state).await.unwrap(),
        None
    );
}

#[tokio::test]
async fn test_user_attachment_found_past_first_member_range() {
    let (provider, directory) = provider(true);
    directory.page_members(2);
    let users: Vec<String> = ["ann", "ben", "cat"]
        .iter()
        .map(|name| directory.seed_user(name, name, "Tester", USERS_DN))
        .collect();
    let members: Vec<&str> = users.iter().map(String::as_str).collect();
    let group = format!("cn=Staff,{USERS_DN}");
    directory.seed(
        &group,
        &[("objectClass", &["top", "group"]), ("member", members.as_slice())],
    );

    let state = json!({"id": "attached", "group_dn": group, "user_dn": users[2]});
    assert!(provider
        .read("ad_user_attachment", state)
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_user_attachment_existing_membership() {
    let (provider, directory) = provider(true);
    let user = directory.seed_user("alice", "Alice", "Liddell", USERS_DN);
    let group = format!("cn=Admins,{USERS_DN}");
    directory.seed(
        &group,
        &[("objectClass", &["top", "group"]), ("member", &[user.as_str()])],
    );

    let state = create(
        &provider,
        "ad_user_attachment",
        json!({"group_dn": group, "user_dn": user}),
    )
    .await;
    assert_eq!(directory.values(&group, "member"), vec![user]);

    directory.remove(&group);
    provider.delete("ad_user_attachment", state).await.unwrap();
}
