// Route lookup and target URL construction from a loaded route list
#[cfg(test)]
mod test {
    use tollgate::{
        config::{GatewayConfig, RouteEntry},
        core::{RouteTable, forwarder::target_url},
    };

    fn config() -> GatewayConfig {
        GatewayConfig::builder()
            .listen_addr("127.0.0.1:8080")
            .route(RouteEntry::new(
                "user-service",
                "/api/users/**",
                "http://users:8081",
                2,
            ))
            .route(RouteEntry::new(
                "order-service",
                "/api/orders/**",
                "http://orders:8082",
                1,
            ))
            .route(RouteEntry::new("legacy", "/legacy/**", "https://legacy.internal", 0))
            .build()
            .unwrap()
    }

    #[test]
    fn test_routes_resolve_in_configured_order() {
        let table = RouteTable::from_entries(&config().routes);
        assert_eq!(table.len(), 3);

        let route = table.find("/api/users/42").unwrap();
        assert_eq!(route.id, "user-service");
        assert_eq!(
            target_url(route, "/api/users/42", Some("active=1")),
            "http://users:8081/42?active=1"
        );

        let route = table.find("/api/orders/7/items").unwrap();
        assert_eq!(route.id, "order-service");
        assert_eq!(
            target_url(route, "/api/orders/7/items", None),
            "http://orders:8082/orders/7/items"
        );

        let route = table.find("/legacy/report.csv").unwrap();
        assert_eq!(
            target_url(route, "/legacy/report.csv", None),
            "https://legacy.internal/legacy/report.csv"
        );
    }

    #[test]
    fn test_unmatched_paths_have_no_route() {
        let table = RouteTable::from_entries(&config().routes);
        assert!(table.find("/unknown").is_none());
        assert!(table.find("/API/users/1").is_none());
        assert!(table.find("/").is_none());
    }

    #[test]
    fn test_prefix_match_is_not_segment_aware() {
        let table = RouteTable::from_entries(&config().routes);
        // "/api/usersXYZ" starts with "/api/users", so it matches the users route.
        assert_eq!(table.find("/api/usersXYZ").unwrap().id, "user-service");
    }

    #[test]
    fn test_stripping_everything_targets_root() {
        let table = RouteTable::from_entries(&config().routes);
        let route = table.find("/api/users").unwrap();
        assert_eq!(target_url(route, "/api/users", None), "http://users:8081/");
    }
}
