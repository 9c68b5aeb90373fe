use super::*;
use std::fs;
use tempfile::TempDir;

#[cfg(test)]
mod integration_tests {
    use super::*;

    #[test]
    fn config_file_persistence() {
        let temp_dir = TempDir::new().expect("should create TempDir successfully");
        let config_path = temp_dir.path().join("config.toml");

        let original_config = Config {
            provider: ProviderConfig {
                kind: ProviderKind::Ollama,
                base_url: Some("https://ollama.example.com:8443".to_string()),
                embedding_model: Some("mxbai-embed-large".to_string()),
                generation_model: None,
                api_key: None,
                timeout_seconds: 45,
                task_prefixes: false,
            },
            ..Config::default()
        };

        let toml_content = toml::to_string_pretty(&original_config)
            .expect("config should convert to toml string successfully");
        fs::write(&config_path, toml_content).expect("should write to config_path successfully");

        let content =
            fs::read_to_string(&config_path).expect("should read from config_path successfully");
        let loaded_config: Config = toml::from_str(&content).expect("should parse toml correctly");

        assert_eq!(original_config, loaded_config);
    }

    #[test]
    fn invalid_toml_handling() {
        let invalid_toml = r#"
            [provider
            kind = "ollama"
            timeout_seconds = "soon"
        "#;

        let result: Result<Config, toml::de::Error> = toml::from_str(invalid_toml);
        assert!(result.is_err());
    }

    #[test]
    fn unknown_provider_kind_is_rejected() {
        let result: Result<Config, toml::de::Error> = toml::from_str(
            r#"
            [provider]
            kind = "openai"
        "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn complete_valid_config() {
        let valid_toml = r#"
            [provider]
            kind = "gemini"
            embedding_model = "text-embedding-004"
            generation_model = "gemini-2.5-flash"
            timeout_seconds = 60

            [chunking]
            chunk_size = 550
            overlap = 150

            [indexing]
            concurrency = 2
            request_interval_ms = 250

            [retrieval]
            top_k = 4
            preview_chars = 300
            corpus_description = "chapter 10 of a statistics textbook"
        "#;

        let config: Config = toml::from_str(valid_toml).expect("should parse toml successfully");
        assert_eq!(config.provider.kind, ProviderKind::Gemini);
        assert_eq!(config.provider.timeout().as_secs(), 60);
        assert_eq!(config.chunking.chunk_size, 550);
        assert_eq!(config.indexing.request_interval().as_millis(), 250);
        assert_eq!(config.retrieval.top_k, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn endpoint_with_different_urls() {
        let cases = vec![
            ("http://localhost:11434", "http://localhost:11434/"),
            ("http://127.0.0.1:8080", "http://127.0.0.1:8080/"),
            ("https://secure.example.com", "https://secure.example.com/"),
        ];

        for (base_url, expected_url) in cases {
            let provider = ProviderConfig {
                base_url: Some(base_url.to_string()),
                ..ProviderConfig::default()
            };

            let url = provider.endpoint().expect("endpoint is ok");
            assert_eq!(url.as_str(), expected_url);
        }
    }

    #[test]
    fn setter_validation() {
        let mut provider = ProviderConfig::default();

        assert!(provider.set_base_url(Some("https://example.com".to_string())).is_ok());
        assert!(provider.set_base_url(None).is_ok());
        assert!(provider.set_embedding_model("all-minilm".to_string()).is_ok());
        assert!(provider.set_generation_model("qwen2.5".to_string()).is_ok());
        assert!(provider.set_timeout_seconds(600).is_ok());

        assert!(provider.set_base_url(Some("not a url".to_string())).is_err());
        assert!(provider.set_embedding_model("   ".to_string()).is_err());
        assert!(provider.set_generation_model(String::new()).is_err());
        assert!(provider.set_timeout_seconds(0).is_err());
        assert!(provider.set_timeout_seconds(601).is_err());

        assert_eq!(provider.embedding_model(), "all-minilm");
        assert_eq!(provider.timeout_seconds, 600);
    }

    #[test]
    fn error_display_messages() {
        let errors = vec![
            ConfigError::InvalidUrl("invalid-url".to_string()),
            ConfigError::InvalidModel(String::new()),
            ConfigError::InvalidTimeout(0),
            ConfigError::MissingApiKey(ProviderKind::Gemini),
            ConfigError::OverlapTooLarge(10, 5),
            ConfigError::InvalidConcurrency(0),
        ];

        for error in errors {
            let message = format!("{error}");
            assert!(message.len() > 10);
        }
    }
}
