#[cfg(test)]
mod deletion_tests {
    use std::sync::Arc;

    use azdash::app::azure_identity::StaticTokenProvider;
    use azdash::app::config::DashConfig;
    use azdash::app::resource_explorer::{
        ApiVersionTable, ArmClient, DeleteError, DeleteOutcome, DeletionOrchestrator,
    };
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SQL_SERVER: &str =
        "/subscriptions/s1/resourceGroups/rg1/providers/Microsoft.Sql/servers/sql1";
    const SITE: &str = "/subscriptions/s1/resourceGroups/rg1/providers/Microsoft.Web/sites/app1";

    fn client_for(server: &MockServer) -> ArmClient {
        let config = DashConfig {
            management_endpoint: server.uri(),
            graph_endpoint: server.uri(),
            ..DashConfig::default()
        };
        let tokens = Arc::new(StaticTokenProvider::new("arm-token", None));
        ArmClient::new(reqwest::Client::new(), tokens, &config)
    }

    fn version_rejected(version: &str) -> ResponseTemplate {
        ResponseTemplate::new(400).set_body_json(json!({
            "error": {
                "code": "NoRegisteredProviderFound",
                "message": format!("No registered resource provider found for location 'westeurope' and API version '{}'", version)
            }
        }))
    }

    async fn mount_delete(server: &MockServer, resource: &str, version: &str, response: ResponseTemplate, times: u64) {
        Mock::given(method("DELETE"))
            .and(path(resource))
            .and(query_param("api-version", version))
            .respond_with(response)
            .expect(times)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_primary_version_success_makes_one_request() {
        let server = MockServer::start().await;
        mount_delete(&server, SQL_SERVER, "2021-11-01", ResponseTemplate::new(200), 1).await;
        mount_delete(&server, SQL_SERVER, "2021-04-01", ResponseTemplate::new(200), 0).await;

        let client = client_for(&server);
        let versions = ApiVersionTable::new();
        let outcome = DeletionOrchestrator::new(&client, &versions)
            .delete(SQL_SERVER)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            DeleteOutcome::Completed {
                api_version: "2021-11-01".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_falls_back_through_versions_in_order() {
        let server = MockServer::start().await;
        mount_delete(&server, SQL_SERVER, "2021-11-01", version_rejected("2021-11-01"), 1).await;
        mount_delete(&server, SQL_SERVER, "2021-04-01", version_rejected("2021-04-01"), 1).await;
        mount_delete(&server, SQL_SERVER, "2020-06-01", ResponseTemplate::new(202), 1).await;
        mount_delete(&server, SQL_SERVER, "2019-10-01", ResponseTemplate::new(200), 0).await;

        let client = client_for(&server);
        let versions = ApiVersionTable::new();
        let outcome = DeletionOrchestrator::new(&client, &versions)
            .delete(SQL_SERVER)
            .await
            .unwrap();

        assert!(outcome.is_pending());
        assert_eq!(outcome.api_version(), "2020-06-01");
    }

    #[tokio::test]
    async fn test_all_versions_rejected_is_version_incompatible() {
        let server = MockServer::start().await;
        for version in ["2021-11-01", "2021-04-01", "2020-06-01", "2019-10-01"] {
            mount_delete(&server, SQL_SERVER, version, version_rejected(version), 1).await;
        }

        let client = client_for(&server);
        let versions = ApiVersionTable::new();
        let err = DeletionOrchestrator::new(&client, &versions)
            .delete(SQL_SERVER)
            .await
            .unwrap_err();

        assert_eq!(
            err,
            DeleteError::VersionIncompatible {
                resource_id: SQL_SERVER.to_string(),
                resource_type: "Microsoft.Sql/servers".to_string(),
                tried: vec![
                    "2021-11-01".to_string(),
                    "2021-04-01".to_string(),
                    "2020-06-01".to_string(),
                    "2019-10-01".to_string(),
                ],
            }
        );
    }

    #[tokio::test]
    async fn test_lock_conflict_stops_immediately() {
        let server = MockServer::start().await;
        mount_delete(
            &server,
            SITE,
            "2022-03-01",
            ResponseTemplate::new(409).set_body_json(json!({
                "error": { "code": "ScopeLocked", "message": "The scope is locked" }
            })),
            1,
        )
        .await;
        mount_delete(&server, SITE, "2021-04-01", ResponseTemplate::new(200), 0).await;

        let client = client_for(&server);
        let versions = ApiVersionTable::new();
        let err = DeletionOrchestrator::new(&client, &versions)
            .delete(SITE)
            .await
            .unwrap_err();

        assert_eq!(err.short_label(), "locked");
        assert!(matches!(err, DeleteError::Locked { ref message, .. } if message == "The scope is locked"));
    }

    #[tokio::test]
    async fn test_forbidden_and_missing_are_classified() {
        let server = MockServer::start().await;
        let missing = "/subscriptions/s1/resourceGroups/rg1/providers/Microsoft.Web/sites/gone";
        mount_delete(&server, SITE, "2022-03-01", ResponseTemplate::new(403), 1).await;
        mount_delete(&server, missing, "2022-03-01", ResponseTemplate::new(404), 1).await;

        let client = client_for(&server);
        let versions = ApiVersionTable::new();
        let orchestrator = DeletionOrchestrator::new(&client, &versions);

        let denied = orchestrator.delete(SITE).await.unwrap_err();
        assert!(matches!(denied, DeleteError::PermissionDenied { status: 403, .. }));
        assert!(denied.user_message().contains("Owner or Contributor"));

        let gone = orchestrator.delete(missing).await.unwrap_err();
        assert_eq!(gone.short_label(), "not-found");
    }

    #[tokio::test]
    async fn test_unknown_type_uses_generic_chain_and_config_overrides() {
        let server = MockServer::start().await;
        let widget = "/subscriptions/s1/resourceGroups/rg1/providers/Contoso.Widgets/widgets/w1";
        mount_delete(&server, widget, "2024-01-01", ResponseTemplate::new(204), 1).await;

        let mut overrides = std::collections::BTreeMap::new();
        overrides.insert("Contoso.Widgets/widgets".to_string(), "2024-01-01".to_string());

        let client = client_for(&server);
        let versions = ApiVersionTable::with_overrides(&overrides);
        let outcome = DeletionOrchestrator::new(&client, &versions)
            .delete(widget)
            .await
            .unwrap();
        assert_eq!(outcome.api_version(), "2024-01-01");
        assert!(!outcome.is_pending());
    }
}
