#[cfg(test)]
mod tests {

    use std::path::Path;

    use crate::config::environment::Environment;
    use crate::config::proc_loader::file_to_config;
    use crate::config::proc_validator::validate_service_config;
    use crate::ServiceConfig;

    #[tokio::test]
    async fn validate_shipped_config_is_valid() {
        let path = Path::new("payer-gateway.yaml");
        let service_config: ServiceConfig = file_to_config(path)
            .await
            .expect("payer-gateway.yaml must exist in repo root for tests");
        validate_service_config(&service_config).await.unwrap();

        assert_eq!(service_config.settings.token.safety_margin_seconds(), 60);
        assert!(service_config.settings.metrics.is_enabled);
        assert!(service_config
            .vendor
            .token_url(Environment::Production)
            .ends_with("/apip/auth/v2/token"));
    }
}
