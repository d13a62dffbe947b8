#[cfg(test)]
mod query_engine_tests {
    use std::sync::Arc;

    use azdash::app::azure_identity::StaticTokenProvider;
    use azdash::app::config::DashConfig;
    use azdash::app::resource_explorer::{
        ArmClient, DashboardState, FailurePolicy, QueryEngine, QueryOutcome, QueryWarning,
    };
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const OWNER_GUID: &str = "8e3af657-a8ff-443c-a75c-2fe8c4bcb635";

    fn engine_for(server: &MockServer, policy: FailurePolicy) -> QueryEngine {
        let config = DashConfig {
            management_endpoint: server.uri(),
            graph_endpoint: server.uri(),
            ..DashConfig::default()
        };
        let tokens = Arc::new(StaticTokenProvider::new("arm-token", Some("graph-token".into())));
        QueryEngine::new(ArmClient::new(reqwest::Client::new(), tokens, &config), policy)
    }

    fn site_id(subscription: &str, name: &str) -> String {
        format!(
            "/subscriptions/{}/resourceGroups/rg1/providers/Microsoft.Web/sites/{}",
            subscription, name
        )
    }

    async fn mount_resources(server: &MockServer, subscription: &str, names: &[&str]) {
        let value: Vec<_> = names
            .iter()
            .map(|name| {
                json!({
                    "id": site_id(subscription, name),
                    "name": name,
                    "type": "Microsoft.Web/sites",
                    "location": "westeurope",
                    "tags": { "env": "prod" }
                })
            })
            .collect();
        Mock::given(method("GET"))
            .and(path(format!("/subscriptions/{}/resources", subscription)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": value })))
            .mount(server)
            .await;
    }

    /// Owner grants as (principal, scope) pairs
    async fn mount_owners(server: &MockServer, subscription: &str, grants: &[(&str, &str)]) {
        let role = format!(
            "/subscriptions/{}/providers/Microsoft.Authorization/roleDefinitions/{}",
            subscription, OWNER_GUID
        );
        let value: Vec<_> = grants
            .iter()
            .enumerate()
            .map(|(i, (principal, scope))| {
                json!({
                    "id": format!("ra-{}-{}", subscription, i),
                    "name": format!("ra-{}", i),
                    "properties": {
                        "principalId": principal,
                        "principalType": "User",
                        "roleDefinitionId": role,
                        "scope": scope
                    }
                })
            })
            .collect();
        Mock::given(method("GET"))
            .and(path(format!(
                "/subscriptions/{}/providers/Microsoft.Authorization/roleAssignments",
                subscription
            )))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": value })))
            .mount(server)
            .await;
    }

    async fn mount_directory(server: &MockServer, response: ResponseTemplate, times: u64) {
        Mock::given(method("POST"))
            .and(path("/v1.0/directoryObjects/getByIds"))
            .respond_with(response)
            .expect(times)
            .mount(server)
            .await;
    }

    fn users(pairs: &[(&str, &str)]) -> ResponseTemplate {
        let value: Vec<_> = pairs
            .iter()
            .map(|(id, name)| {
                json!({ "@odata.type": "#microsoft.graph.user", "id": id, "displayName": name })
            })
            .collect();
        ResponseTemplate::new(200).set_body_json(json!({ "value": value }))
    }

    fn subs(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_owners_across_subscriptions_with_one_directory_call() {
        let server = MockServer::start().await;
        let app1 = site_id("s1", "app1");
        mount_resources(&server, "s1", &["app1", "app2"]).await;
        mount_resources(&server, "s2", &["app3"]).await;
        mount_owners(&server, "s1", &[("u1", app1.as_str()), ("u2", "/subscriptions/s1")]).await;
        mount_owners(&server, "s2", &[("u2", "/subscriptions/s2")]).await;
        mount_directory(&server, users(&[("u1", "Alice"), ("u2", "Bob")]), 1).await;

        let outcome = engine_for(&server, FailurePolicy::AbortOnError)
            .query(&subs(&["s1", "s2"]))
            .await
            .unwrap();

        let QueryOutcome::Ok(report) = outcome else {
            panic!("expected a complete result");
        };
        assert_eq!(report.subscriptions, subs(&["s1", "s2"]));

        let owners: Vec<(&str, Vec<String>)> = report
            .resources
            .iter()
            .map(|r| (r.resource.name.as_str(), r.owners.clone()))
            .collect();
        assert_eq!(
            owners,
            vec![
                ("app1", vec!["Alice".to_string()]),
                ("app2", vec!["Bob".to_string()]),
                ("app3", vec!["Bob".to_string()]),
            ]
        );

        insta::assert_json_snapshot!(report.resources[0], @r###"
        {
          "id": "/subscriptions/s1/resourceGroups/rg1/providers/Microsoft.Web/sites/app1",
          "name": "app1",
          "type": "Microsoft.Web/sites",
          "location": "westeurope",
          "tags": {
            "env": "prod"
          },
          "subscriptionId": "s1",
          "resourceGroup": "rg1",
          "owners": [
            "Alice"
          ]
        }
        "###);
    }

    #[tokio::test]
    async fn test_no_owner_assignments_skips_directory() {
        let server = MockServer::start().await;
        mount_resources(&server, "s1", &["app1"]).await;
        mount_owners(&server, "s1", &[]).await;
        mount_directory(&server, users(&[]), 0).await;

        let outcome = engine_for(&server, FailurePolicy::AbortOnError)
            .query(&subs(&["s1"]))
            .await
            .unwrap();

        assert!(!outcome.is_partial());
        assert!(outcome.report().resources[0].owners.is_empty());
    }

    #[tokio::test]
    async fn test_directory_failure_is_reported_and_ids_shown() {
        let server = MockServer::start().await;
        mount_resources(&server, "s1", &["app1"]).await;
        mount_owners(&server, "s1", &[("u1", "/subscriptions/s1")]).await;
        mount_directory(&server, ResponseTemplate::new(403), 1).await;

        let outcome = engine_for(&server, FailurePolicy::AbortOnError)
            .query(&subs(&["s1"]))
            .await
            .unwrap();

        assert!(outcome.is_partial());
        assert!(matches!(
            outcome.warnings(),
            [QueryWarning::DirectoryUnavailable { .. }]
        ));
        assert_eq!(outcome.report().resources[0].owners, vec!["u1"]);
    }

    #[tokio::test]
    async fn test_abort_policy_fails_whole_query() {
        let server = MockServer::start().await;
        mount_resources(&server, "s1", &["app1"]).await;
        mount_owners(&server, "s1", &[]).await;
        Mock::given(method("GET"))
            .and(path("/subscriptions/s2/resources"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;
        mount_owners(&server, "s2", &[]).await;

        let err = engine_for(&server, FailurePolicy::AbortOnError)
            .query(&subs(&["s1", "s2"]))
            .await
            .unwrap_err();
        assert_eq!(err.api_error().map(|e| e.status), Some(403));
    }

    #[tokio::test]
    async fn test_isolate_policy_keeps_healthy_subscriptions() {
        let server = MockServer::start().await;
        mount_resources(&server, "s1", &["app1"]).await;
        mount_owners(&server, "s1", &[]).await;
        Mock::given(method("GET"))
            .and(path("/subscriptions/s2/resources"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;
        mount_owners(&server, "s2", &[]).await;

        let outcome = engine_for(&server, FailurePolicy::IsolateSubscriptions)
            .query(&subs(&["s1", "s2"]))
            .await
            .unwrap();

        let (report, warnings) = outcome.into_parts();
        assert_eq!(report.subscriptions, subs(&["s1"]));
        assert_eq!(report.resources.len(), 1);
        assert_eq!(warnings.len(), 1);
        assert!(matches!(
            &warnings[0],
            QueryWarning::SubscriptionFailed { subscription_id, .. } if subscription_id == "s2"
        ));
    }

    #[tokio::test]
    async fn test_owner_listing_failure_fails_subscription() {
        let server = MockServer::start().await;
        mount_resources(&server, "s1", &["app1"]).await;
        Mock::given(method("GET"))
            .and(path("/subscriptions/s1/providers/Microsoft.Authorization/roleAssignments"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = engine_for(&server, FailurePolicy::AbortOnError)
            .query(&subs(&["s1"]))
            .await
            .unwrap_err();
        assert_eq!(err.short_label(), "denied");
    }

    #[tokio::test]
    async fn test_resource_group_query_uses_subscription_owners() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/subscriptions/s1/resourceGroups/rg1/resources"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [{
                    "id": site_id("s1", "app1"),
                    "name": "app1",
                    "type": "Microsoft.Web/sites"
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;
        mount_owners(&server, "s1", &[("u2", "/subscriptions/s1")]).await;
        mount_directory(&server, users(&[("u2", "Bob")]), 1).await;

        let outcome = engine_for(&server, FailurePolicy::AbortOnError)
            .query_resource_group("s1", "rg1")
            .await
            .unwrap();
        assert_eq!(outcome.report().resources[0].owners, vec!["Bob"]);
    }

    #[tokio::test]
    async fn test_outcome_feeds_dashboard_state() {
        let server = MockServer::start().await;
        mount_resources(&server, "s1", &["app1", "app2"]).await;
        mount_owners(&server, "s1", &[]).await;

        let outcome = engine_for(&server, FailurePolicy::AbortOnError)
            .query(&subs(&["s1", "s1"]))
            .await
            .unwrap();

        let mut state = DashboardState::new();
        state.record_outcome(outcome);
        assert_eq!(state.resources().len(), 2);
        assert!(state.last_updated().is_some());

        assert!(state.remove_resource(&site_id("s1", "app1")));
        assert_eq!(state.resources().len(), 1);
    }
}
