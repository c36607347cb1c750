use super::*;
use serial_test::serial;
use std::env;
use std::net::IpAddr;
use std::time::Duration;

fn with_env_vars<F, R>(vars: &[(&str, &str)], f: F) -> R
where
    F: FnOnce() -> R,
{
    // SAFETY: Test code only, we accept the thread-safety risk in tests.
    for (key, value) in vars {
        unsafe { env::set_var(key, value) };
    }

    let result = f();

    // SAFETY: Test code only, we accept the thread-safety risk in tests.
    for (key, _) in vars {
        unsafe { env::remove_var(key) };
    }

    result
}

fn clear_plagwatch_env() {
    let keys = [
        "PLAGWATCH_PORT",
        "PLAGWATCH_BIND_ADDR",
        "PLAGWATCH_DATABASE_URL",
        "PLAGWATCH_DB_MAX_CONNECTIONS",
        "PLAGWATCH_QDRANT_URL",
        "PLAGWATCH_COLLECTION",
        "PLAGWATCH_EMBEDDING_URL",
        "PLAGWATCH_EMBEDDING_MODEL",
        "PLAGWATCH_EMBEDDING_API_KEY",
        "PLAGWATCH_EMBEDDING_DIM",
        "PLAGWATCH_EMBED_TIMEOUT_MS",
        "PLAGWATCH_SEARCH_TIMEOUT_MS",
        "PLAGWATCH_TOP_K",
        "PLAGWATCH_DEFAULT_THRESHOLD",
        "PLAGWATCH_THRESHOLD_CACHE_TTL_SECS",
        "PLAGWATCH_CHANNEL_CAPACITY",
        "PLAGWATCH_LOG_JSON",
    ];
    // SAFETY: Test code only, we accept the thread-safety risk in tests.
    for key in keys {
        unsafe { env::remove_var(key) };
    }
}

#[test]
fn test_default_config() {
    let config = Config::default();

    assert_eq!(config.port, 8080);
    assert_eq!(
        config.bind_addr,
        IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1))
    );
    assert_eq!(config.qdrant_url, "http://localhost:6334");
    assert_eq!(config.collection_name, "submission_embeddings");
    assert_eq!(config.embedding_dim, 768);
    assert_eq!(config.top_k, 10);
    assert!((config.default_threshold - 0.85).abs() < f32::EPSILON);
    assert!(config.threshold_cache_ttl.is_zero());
    assert!(config.embedding_api_key.is_none());
    assert!(!config.log_json);
}

#[test]
fn test_socket_addr() {
    let config = Config::default();
    assert_eq!(config.socket_addr(), "127.0.0.1:8080");

    let config = Config {
        port: 3000,
        bind_addr: IpAddr::V4(std::net::Ipv4Addr::new(0, 0, 0, 0)),
        ..Default::default()
    };
    assert_eq!(config.socket_addr(), "0.0.0.0:3000");
}

#[test]
#[serial]
fn test_from_env_with_defaults() {
    clear_plagwatch_env();

    let config = Config::from_env().expect("should parse with defaults");

    assert_eq!(config.port, 8080);
    assert_eq!(config.database_url, "postgres://localhost/plagwatch");
    assert_eq!(config.embed_timeout, Duration::from_millis(10_000));
    assert_eq!(config.search_timeout, Duration::from_millis(5_000));
    assert!(config.validate().is_ok());
}

#[test]
#[serial]
fn test_from_env_overrides() {
    clear_plagwatch_env();

    with_env_vars(
        &[
            ("PLAGWATCH_PORT", "9090"),
            ("PLAGWATCH_BIND_ADDR", "0.0.0.0"),
            ("PLAGWATCH_QDRANT_URL", "http://qdrant.cluster:6334"),
            ("PLAGWATCH_EMBEDDING_DIM", "1024"),
            ("PLAGWATCH_EMBED_TIMEOUT_MS", "2500"),
            ("PLAGWATCH_TOP_K", "25"),
            ("PLAGWATCH_DEFAULT_THRESHOLD", "0.9"),
            ("PLAGWATCH_THRESHOLD_CACHE_TTL_SECS", "60"),
            ("PLAGWATCH_EMBEDDING_API_KEY", "  sk-test  "),
            ("PLAGWATCH_LOG_JSON", "true"),
        ],
        || {
            let config = Config::from_env().expect("should parse");

            assert_eq!(config.port, 9090);
            assert_eq!(config.socket_addr(), "0.0.0.0:9090");
            assert_eq!(config.qdrant_url, "http://qdrant.cluster:6334");
            assert_eq!(config.embedding_dim, 1024);
            assert_eq!(config.dim_config().embedding_dim, 1024);
            assert_eq!(config.embed_timeout, Duration::from_millis(2500));
            assert_eq!(config.top_k, 25);
            assert!((config.default_threshold - 0.9).abs() < f32::EPSILON);
            assert_eq!(config.threshold_cache_ttl, Duration::from_secs(60));
            assert_eq!(config.embedding_api_key.as_deref(), Some("sk-test"));
            assert!(config.log_json);
            assert!(config.validate().is_ok());
        },
    );
}

#[test]
#[serial]
fn test_blank_api_key_is_none() {
    clear_plagwatch_env();

    with_env_vars(&[("PLAGWATCH_EMBEDDING_API_KEY", "   ")], || {
        let config = Config::from_env().expect("should parse");
        assert!(config.embedding_api_key.is_none());
    });
}

#[test]
#[serial]
fn test_invalid_port_zero() {
    clear_plagwatch_env();

    with_env_vars(&[("PLAGWATCH_PORT", "0")], || {
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPort { .. }));
        assert!(err.to_string().contains("invalid port"));
    });
}

#[test]
#[serial]
fn test_invalid_port_not_number() {
    clear_plagwatch_env();

    with_env_vars(&[("PLAGWATCH_PORT", "not_a_port")], || {
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::PortParseError { .. }));
    });
}

#[test]
#[serial]
fn test_invalid_bind_addr() {
    clear_plagwatch_env();

    with_env_vars(&[("PLAGWATCH_BIND_ADDR", "not.an.ip.address")], || {
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBindAddr { .. }));
    });
}

#[test]
#[serial]
fn test_invalid_number_is_reported() {
    clear_plagwatch_env();

    with_env_vars(&[("PLAGWATCH_EMBEDDING_DIM", "lots")], || {
        let err = Config::from_env().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidNumber {
                name: "PLAGWATCH_EMBEDDING_DIM",
                ..
            }
        ));
        assert!(err.to_string().contains("lots"));
    });
}

#[test]
fn test_validate_threshold_out_of_range() {
    let config = Config {
        default_threshold: 1.5,
        ..Default::default()
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::ThresholdOutOfRange { .. })
    ));
}

#[test]
fn test_validate_zero_dim() {
    let config = Config {
        embedding_dim: 0,
        ..Default::default()
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::MustBePositive { .. })
    ));
}

#[test]
fn test_validate_top_k_bounds() {
    let zero = Config {
        top_k: 0,
        ..Default::default()
    };
    assert!(matches!(
        zero.validate(),
        Err(ConfigError::MustBePositive { .. })
    ));

    let huge = Config {
        top_k: 10_000,
        ..Default::default()
    };
    assert!(matches!(
        huge.validate(),
        Err(ConfigError::AboveMaximum { max: 500, .. })
    ));
}

#[test]
fn test_validate_cache_ttl_ceiling() {
    let config = Config {
        threshold_cache_ttl: Duration::from_secs(301),
        ..Default::default()
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::AboveMaximum { max: 300, .. })
    ));
}

#[test]
fn test_validate_zero_timeouts() {
    let config = Config {
        embed_timeout: Duration::ZERO,
        ..Default::default()
    };
    assert!(config.validate().is_err());

    let config = Config {
        search_timeout: Duration::ZERO,
        ..Default::default()
    };
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_empty_url() {
    let config = Config {
        qdrant_url: " ".to_string(),
        ..Default::default()
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::EmptyUrl {
            name: "PLAGWATCH_QDRANT_URL"
        })
    ));
}
