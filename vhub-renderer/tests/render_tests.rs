use chrono::{TimeZone, Utc};

use vhub_core::types::{HealthState, HealthStatus, RegistryData};
use vhub_renderer::Renderer;

/// A data file as older servers wrote it: empty maps encoded as `null`.
const LEGACY_FILE: &str = r#"{
  "regions": {
    "amer": {
      "name": "amer",
      "environments": {
        "dev": { "name": "dev", "apps": {
          "billing": { "name": "billing", "version": "3.2.1", "route": "/billing", "date": "2024-05-01T10:00:00Z" },
          "auth": { "name": "", "version": "1.0.0", "route": "", "date": "" }
        } },
        "qa": { "name": "qa", "apps": null }
      }
    },
    "apac": { "name": "apac", "environments": null }
  }
}"#;

fn legacy_data() -> RegistryData {
    let mut data: RegistryData = serde_json::from_str(LEGACY_FILE).expect("decode legacy file");
    data.normalize();
    data
}

#[test]
fn csv_export_of_legacy_file() {
    let csv = Renderer::new()
        .expect("renderer")
        .render_csv(&legacy_data())
        .expect("render");
    assert_eq!(
        csv,
        "Region,Environment,App,Version,Route,Date\n\
         amer,dev,auth,1.0.0,,\n\
         amer,dev,billing,3.2.1,/billing,2024-05-01T10:00:00Z\n"
    );
}

#[test]
fn dashboard_shows_empty_nodes_and_health() {
    let health = vec![
        HealthStatus {
            region: "amer".into(),
            environment: "dev".into(),
            url: "http://billing.internal".into(),
            status: HealthState::Ok,
            last_checked: Some(Utc.with_ymd_and_hms(2024, 5, 1, 10, 5, 0).unwrap()),
        },
        HealthStatus {
            region: "apac".into(),
            environment: "dr".into(),
            url: "http://dr.internal".into(),
            status: HealthState::Unknown,
            last_checked: None,
        },
    ];
    let html = Renderer::new()
        .expect("renderer")
        .render_dashboard(&legacy_data(), &health)
        .expect("render");

    assert!(html.contains("2 regions, 2 environments, 2 apps."));
    assert!(html.contains("<td>dev</td><td>auth</td>"), "name filled from key");
    assert!(html.contains("<td>qa</td><td colspan=\"4\"><em>no apps</em></td>"));
    assert!(html.contains("<p>No environments.</p>"));
    assert!(html.contains("class=\"OK\""));
    assert!(html.contains("2024-05-01T10:05:00Z"));
    assert!(html.contains("class=\"Unknown\""));
}
