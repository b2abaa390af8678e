// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `config.rs`

#[cfg(test)]
mod tests {
    use crate::config::{Cli, ConfigError, ControllerConfig};
    use clap::Parser;

    fn env_with_token(var: &str) -> Option<String> {
        (var == "HC_ACCESS_TOKEN").then(|| "secret-token".to_string())
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["capi-hetzner"]);
        assert_eq!(cli.metrics_bind_address.to_string(), "0.0.0.0:8080");
        assert_eq!(cli.image, "ubuntu-18.04");
        assert_eq!(cli.hcloud_endpoint, "https://api.hetzner.cloud/v1");
        assert!(cli.ssh_key_name.is_none());
        assert!(cli.namespace.is_none());
    }

    #[test]
    fn test_flags_are_parsed() {
        let cli = Cli::parse_from([
            "capi-hetzner",
            "--metrics-bind-address",
            "127.0.0.1:9090",
            "--ssh-key-name",
            "ops@example.com",
            "--image",
            "ubuntu-22.04",
            "--namespace",
            "capi-system",
            "--hcloud-endpoint",
            "http://localhost:8000/v1",
        ]);

        let config = ControllerConfig::from_args(cli, env_with_token).unwrap();
        assert_eq!(config.metrics_bind_address.port(), 9090);
        assert_eq!(config.namespace.as_deref(), Some("capi-system"));
        assert_eq!(config.hcloud_endpoint, "http://localhost:8000/v1");
        assert_eq!(config.hcloud_token, "secret-token");
        assert_eq!(config.settings.default_image, "ubuntu-22.04");
        assert_eq!(
            config.settings.default_ssh_key_name.as_deref(),
            Some("ops@example.com")
        );
    }

    #[test]
    fn test_missing_token_is_fatal() {
        let cli = Cli::parse_from(["capi-hetzner"]);
        let err = ControllerConfig::from_args(cli, no_env).unwrap_err();
        assert_eq!(err, ConfigError::MissingToken("HC_ACCESS_TOKEN"));
    }

    #[test]
    fn test_blank_token_is_fatal() {
        let cli = Cli::parse_from(["capi-hetzner"]);
        let err = ControllerConfig::from_args(cli, |_| Some("   ".to_string())).unwrap_err();
        assert!(matches!(err, ConfigError::MissingToken(_)));
    }

    #[test]
    fn test_blank_image_rejected() {
        let cli = Cli::parse_from(["capi-hetzner", "--image", ""]);
        let err = ControllerConfig::from_args(cli, env_with_token).unwrap_err();
        assert_eq!(err, ConfigError::EmptyFlag { flag: "image" });
    }

    #[test]
    fn test_debug_redacts_token() {
        let cli = Cli::parse_from(["capi-hetzner"]);
        let config = ControllerConfig::from_args(cli, env_with_token).unwrap();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("secret-token"));
    }
}
