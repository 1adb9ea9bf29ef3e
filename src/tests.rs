#[cfg(test)]
mod integration_tests {
    use crate::{
        convert_image, health_handler, screenshot_handler, AppState, Config, OutputFormat,
        RateLimitSettings, RateLimiter, ScreenshotError, ScreenshotRequest, ScreenshotResponse,
        ScreenshotService, Viewport,
    };
    use axum::extract::{Extension, Json};
    use axum::http::StatusCode;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.bind, "0.0.0.0");
        assert_eq!(config.port, 3030);
        assert_eq!(config.screenshot_timeout, Duration::from_secs(30));
        assert!(config.wait_for_network_idle);
        assert!(matches!(config.output_format, OutputFormat::Png));
        assert_eq!(config.rate_limit.max_requests, 60);
        assert_eq!(config.rate_limit.window, Duration::from_secs(60));
        assert!(!config.metrics_enabled);
    }

    #[test]
    fn test_config_validation() {
        assert!(crate::validate_config(&Config::default()).is_ok());

        let bad_port = Config {
            port: 0,
            ..Default::default()
        };
        assert!(crate::validate_config(&bad_port).is_err());

        let bad_timeout = Config {
            screenshot_timeout: Duration::ZERO,
            ..Default::default()
        };
        assert!(crate::validate_config(&bad_timeout).is_err());

        let bad_viewport = Config {
            viewport: Viewport {
                width: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(crate::validate_config(&bad_viewport).is_err());

        let bad_limit = Config {
            rate_limit: RateLimitSettings {
                max_requests: 0,
                window: Duration::from_secs(60),
            },
            ..Default::default()
        };
        assert!(crate::validate_config(&bad_limit).is_err());
    }

    #[test]
    fn test_viewport_default_and_mobile() {
        let viewport = Viewport::default();
        assert_eq!(viewport.width, 1920);
        assert_eq!(viewport.height, 1080);
        assert_eq!(viewport.device_scale_factor, 1.0);
        assert!(!viewport.mobile);

        let mobile = Viewport::mobile();
        assert_eq!(mobile.width, 375);
        assert_eq!(mobile.height, 667);
        assert_eq!(mobile.device_scale_factor, 2.0);
        assert!(mobile.mobile);
    }

    #[test]
    fn test_chrome_args_generation() {
        let config = Config::default();
        let args = crate::get_chrome_args(&config);

        assert!(args.contains(&"--headless".to_string()));
        assert!(args.contains(&"--no-sandbox".to_string()));
        assert!(args.contains(&"--disable-gpu".to_string()));
        assert!(args.contains(&format!(
            "--window-size={},{}",
            config.viewport.width, config.viewport.height
        )));
    }

    #[test]
    fn test_request_deserialization_defaults() {
        let request: ScreenshotRequest =
            serde_json::from_str(r#"{"url": "https://example.com"}"#).unwrap();

        assert_eq!(request.url.as_deref(), Some("https://example.com"));
        assert!(request.selector.is_none());
        assert!(!request.full_page);
        assert!(request.filename.is_none());
        assert!(request.format.is_none());
        assert!(request.quality.is_none());
        assert!(request.width.is_none());
        assert!(request.wait_for.is_none());
        assert!(request.timeout.is_none());
        assert!(request.return_base64.is_none());
        assert!(!request.mobile);
    }

    #[test]
    fn test_request_camel_case_fields() {
        let request: ScreenshotRequest = serde_json::from_str(
            r##"{
                "url": "https://example.com",
                "fullPage": true,
                "returnBase64": false,
                "waitFor": 500,
                "selector": "#main"
            }"##,
        )
        .unwrap();

        assert!(request.full_page);
        assert_eq!(request.return_base64, Some(false));
        assert_eq!(request.wait_for, Some(500));
        assert_eq!(request.selector.as_deref(), Some("#main"));
    }

    #[test]
    fn test_format_jpg_alias() {
        let request: ScreenshotRequest =
            serde_json::from_str(r#"{"url": "https://example.com", "format": "jpg"}"#).unwrap();
        assert_eq!(request.format, Some(OutputFormat::Jpeg));

        let request: ScreenshotRequest =
            serde_json::from_str(r#"{"url": "https://example.com", "format": "jpeg"}"#).unwrap();
        assert_eq!(request.format, Some(OutputFormat::Jpeg));
    }

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            ScreenshotError::MissingUrl.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ScreenshotError::InvalidUrl("x".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ScreenshotError::InvalidParameter("x".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ScreenshotError::RateLimited.status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            ScreenshotError::CaptureFailed("x".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ScreenshotError::Timeout(Duration::from_secs(1)).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ScreenshotError::ElementNotFound("#x".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(ScreenshotError::MissingUrl.to_string(), "URL is required");
        assert_eq!(
            ScreenshotError::ElementNotFound("#nope".to_string()).to_string(),
            "Element #nope not found"
        );
        assert_eq!(ScreenshotError::RateLimited.to_string(), "Too many requests");
    }

    #[tokio::test]
    async fn test_rate_limiter() {
        let limiter = RateLimiter::new(5, Duration::from_secs(60));

        for _ in 0..5 {
            assert!(limiter.acquire().await);
        }

        assert!(!limiter.acquire().await);
        assert_eq!(limiter.get_current_rate().await, 5);
    }

    #[tokio::test]
    async fn test_rate_limiter_window_expiry() {
        let limiter = RateLimiter::new(2, Duration::from_millis(50));

        assert!(limiter.acquire().await);
        assert!(limiter.acquire().await);
        assert!(!limiter.acquire().await);

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(limiter.acquire().await);
    }

    fn test_service() -> ScreenshotService {
        ScreenshotService::new(Config::default())
    }

    #[test]
    fn test_resolve_missing_url() {
        let service = test_service();

        let err = service.resolve(ScreenshotRequest::default()).unwrap_err();
        assert!(matches!(err, ScreenshotError::MissingUrl));

        let blank = ScreenshotRequest {
            url: Some("   ".to_string()),
            ..Default::default()
        };
        let err = service.resolve(blank).unwrap_err();
        assert!(matches!(err, ScreenshotError::MissingUrl));
    }

    #[test]
    fn test_resolve_rejects_bad_input() {
        let service = test_service();
        let base = ScreenshotRequest {
            url: Some("https://example.com".to_string()),
            ..Default::default()
        };

        let bad_scheme = ScreenshotRequest {
            url: Some("ftp://example.com".to_string()),
            ..base.clone()
        };
        assert!(matches!(
            service.resolve(bad_scheme).unwrap_err(),
            ScreenshotError::InvalidUrl(_)
        ));

        let bad_quality = ScreenshotRequest {
            quality: Some(0),
            ..base.clone()
        };
        assert!(matches!(
            service.resolve(bad_quality).unwrap_err(),
            ScreenshotError::InvalidParameter(_)
        ));

        let bad_width = ScreenshotRequest {
            width: Some(100_000),
            ..base.clone()
        };
        assert!(matches!(
            service.resolve(bad_width).unwrap_err(),
            ScreenshotError::InvalidParameter(_)
        ));

        let bad_wait = ScreenshotRequest {
            wait_for: Some(60_000),
            ..base.clone()
        };
        assert!(matches!(
            service.resolve(bad_wait).unwrap_err(),
            ScreenshotError::InvalidParameter(_)
        ));

        let bad_timeout = ScreenshotRequest {
            timeout: Some(600_000),
            ..base
        };
        assert!(matches!(
            service.resolve(bad_timeout).unwrap_err(),
            ScreenshotError::InvalidParameter(_)
        ));
    }

    #[test]
    fn test_resolve_applies_defaults() {
        let service = test_service();

        let resolved = service
            .resolve(ScreenshotRequest {
                url: Some("https://example.com".to_string()),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(resolved.format, OutputFormat::Png);
        assert_eq!(resolved.quality, 85);
        assert_eq!(resolved.viewport, Viewport::default());
        assert_eq!(resolved.timeout, Duration::from_secs(30));
        assert!(resolved.wait_for.is_zero());
        assert!(resolved.return_base64);
        assert_eq!(resolved.filename, "screenshot.png");
        assert!(!resolved.id.is_empty());
    }

    #[test]
    fn test_resolve_mobile_preset() {
        let service = test_service();

        let resolved = service
            .resolve(ScreenshotRequest {
                url: Some("https://example.com".to_string()),
                mobile: true,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(resolved.viewport, Viewport::mobile());

        // Explicit dimensions override the preset
        let resolved = service
            .resolve(ScreenshotRequest {
                url: Some("https://example.com".to_string()),
                mobile: true,
                width: Some(414),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(resolved.viewport.width, 414);
        assert_eq!(resolved.viewport.height, 667);
        assert_eq!(resolved.viewport.device_scale_factor, 2.0);
    }

    #[test]
    fn test_resolve_filename_handling() {
        let service = test_service();

        let resolved = service
            .resolve(ScreenshotRequest {
                url: Some("https://example.com".to_string()),
                filename: Some("../evil/page.png".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(resolved.filename, ".._evil_page.png");

        // Default extension follows the requested format
        let resolved = service
            .resolve(ScreenshotRequest {
                url: Some("https://example.com".to_string()),
                format: Some(OutputFormat::Jpeg),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(resolved.filename, "screenshot.jpg");
    }

    #[test]
    fn test_response_serialization_shape() {
        let response = ScreenshotResponse {
            success: true,
            image: Some("aGVsbG8=".to_string()),
            file: None,
            mime_type: "image/png".to_string(),
            size: 5,
            dimensions: crate::Dimensions {
                width: 800,
                height: 600,
            },
            url: "https://example.com/".to_string(),
            timestamp: "2026-08-25T19:49:00.123Z".to_string(),
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["image"], "aGVsbG8=");
        assert_eq!(json["mimeType"], "image/png");
        assert_eq!(json["dimensions"]["width"], 800);
        assert!(json.get("file").is_none());

        let file_response = ScreenshotResponse {
            image: None,
            file: Some("screenshots/page.png".to_string()),
            ..response
        };
        let json = serde_json::to_value(&file_response).unwrap();
        assert_eq!(json["file"], "screenshots/page.png");
        assert!(json.get("image").is_none());
    }

    fn tiny_png() -> Vec<u8> {
        let img = image::RgbImage::from_pixel(4, 4, image::Rgb([120, 10, 200]));
        let mut png = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();
        png
    }

    #[test]
    fn test_convert_image_png_passthrough() {
        let png = tiny_png();
        let converted = convert_image(png.clone(), OutputFormat::Png, 85).unwrap();
        assert_eq!(converted, png);
    }

    #[test]
    fn test_convert_image_to_jpeg() {
        let jpeg = convert_image(tiny_png(), OutputFormat::Jpeg, 85).unwrap();
        assert!(jpeg.starts_with(&[0xFF, 0xD8]));
    }

    #[test]
    fn test_convert_image_to_webp() {
        let webp = convert_image(tiny_png(), OutputFormat::Webp, 85).unwrap();
        assert!(!webp.is_empty());
        assert_eq!(&webp[..4], b"RIFF");
    }

    fn create_test_state(config: Config) -> Arc<AppState> {
        Arc::new(AppState::new(config).expect("test state"))
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_screenshot_handler_missing_url() {
        let state = create_test_state(Config::default());

        let response =
            screenshot_handler(Extension(state), Json(ScreenshotRequest::default())).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json = body_json(response).await;
        assert_eq!(json["error"], "URL is required");
    }

    #[tokio::test]
    async fn test_screenshot_handler_bad_scheme() {
        let state = create_test_state(Config::default());

        let request = ScreenshotRequest {
            url: Some("ftp://example.com".to_string()),
            ..Default::default()
        };
        let response = screenshot_handler(Extension(state), Json(request)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json = body_json(response).await;
        assert!(json["error"].as_str().unwrap().starts_with("Invalid URL"));
    }

    #[tokio::test]
    async fn test_screenshot_handler_rate_limited() {
        let config = Config {
            rate_limit: RateLimitSettings {
                max_requests: 1,
                window: Duration::from_secs(60),
            },
            ..Default::default()
        };
        let state = create_test_state(config);

        // First request consumes the window; it still fails validation,
        // which proves the limiter runs before any browser work.
        let response = screenshot_handler(
            Extension(state.clone()),
            Json(ScreenshotRequest::default()),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response =
            screenshot_handler(Extension(state), Json(ScreenshotRequest::default())).await;
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        let json = body_json(response).await;
        assert_eq!(json["error"], "Too many requests");
    }

    #[tokio::test]
    async fn test_health_handler() {
        let state = create_test_state(Config::default());

        let response = health_handler(Extension(state)).await;
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["status"], "ok");
        // Lazy launch: no browser exists before the first capture
        assert_eq!(json["browserConnected"], false);
        assert!(json["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    #[tokio::test]
    async fn test_take_screenshot_real_browser() {
        let service = ScreenshotService::new(Config {
            screenshot_timeout: Duration::from_secs(10),
            ..Default::default()
        });

        let request = ScreenshotRequest {
            url: Some("https://example.com".to_string()),
            ..Default::default()
        };

        match service.take_screenshot(request).await {
            Ok(response) => {
                assert!(response.success);
                assert!(response.image.is_some());
                assert!(response.file.is_none());
                assert_eq!(response.mime_type, "image/png");
                assert!(response.size > 0);
                assert!(service.browser_connected().await);
            }
            Err(e) => {
                // This might fail in CI/CD without proper Chrome setup
                eprintln!("⚠️  Screenshot test skipped (Chrome unavailable?): {e:?}");
            }
        }

        service.shutdown().await;
    }

    #[tokio::test]
    async fn test_browser_handle_reuse() {
        let service = ScreenshotService::new(Config {
            screenshot_timeout: Duration::from_secs(10),
            ..Default::default()
        });

        let request = ScreenshotRequest {
            url: Some("https://example.com".to_string()),
            ..Default::default()
        };

        let first = service.take_screenshot(request.clone()).await;
        if first.is_err() {
            eprintln!("⚠️  Browser reuse test skipped (Chrome unavailable?)");
            service.shutdown().await;
            return;
        }

        // Second capture reuses the same instance
        let second = service.take_screenshot(request).await;
        assert!(second.is_ok());
        assert!(service.browser_connected().await);

        service.shutdown().await;
        assert!(!service.browser_connected().await);
    }
}
