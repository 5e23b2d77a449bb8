//! Test Prediction Client
//!
//! Posts prediction requests to a running backend and checks the responses.
//!
//! Usage: test_client [backend_url] [count] [delay_ms]

use rand::Rng;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{info, warn};

/// Request body matching the backend's `/predict` contract
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct PredictionPayload {
    snp_risk_allele: String,
    p_value: String,
    or_beta: String,
    risk_allele_frequency: String,
    p_value_mlog: String,
}

/// Keys a successful response must carry, and nothing else
const EXPECTED_KEYS: [&str; 2] = ["risk", "timestamp"];

/// Known AD-associated risk alleles used for generated requests
const ALLELES: [&str; 6] = [
    "rs429358-C",
    "rs7412-T",
    "rs6733839-T",
    "rs11218343-C",
    "rs9331896-C",
    "rs4147929-A",
];

struct PayloadGenerator {
    rng: rand::rngs::ThreadRng,
}

impl PayloadGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
        }
    }

    /// The APOE e4 reference request
    fn reference() -> PredictionPayload {
        PredictionPayload {
            snp_risk_allele: "rs429358-C".to_string(),
            p_value: "1e-200".to_string(),
            or_beta: "3.685".to_string(),
            risk_allele_frequency: "0.15".to_string(),
            p_value_mlog: "200".to_string(),
        }
    }

    /// A random but well-formed request
    fn generate(&mut self) -> PredictionPayload {
        let mlog: f64 = self.rng.gen_range(5.0..200.0);
        PredictionPayload {
            snp_risk_allele: ALLELES[self.rng.gen_range(0..ALLELES.len())].to_string(),
            p_value: format!("{:e}", 10f64.powf(-mlog)),
            or_beta: format!("{:.3}", self.rng.gen_range(0.5..4.0)),
            risk_allele_frequency: format!("{:.3}", self.rng.gen_range(0.01..0.6)),
            p_value_mlog: format!("{:.1}", mlog),
        }
    }
}

fn check_response(body: &Value) {
    let Some(object) = body.as_object() else {
        warn!("Response is not a JSON object");
        return;
    };
    for key in EXPECTED_KEYS {
        if !object.contains_key(key) {
            warn!("Expected key '{}' not found in response", key);
        }
    }
    for key in object.keys() {
        if !EXPECTED_KEYS.contains(&key.as_str()) {
            warn!("Unexpected key '{}' in response", key);
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("test_client=info".parse()?),
        )
        .init();

    info!("Starting Test Prediction Client");

    let args: Vec<String> = std::env::args().collect();
    let backend_url = args
        .get(1)
        .cloned()
        .or_else(|| std::env::var("BACKEND_URL").ok())
        .unwrap_or_else(|| "http://localhost:8080".to_string());
    let count: u64 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(1);
    let delay_ms: u64 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(100);

    let url = format!("{}/predict", backend_url.trim_end_matches('/'));
    info!(url = %url, count = count, delay_ms = delay_ms, "Configuration loaded");

    let client = reqwest::Client::new();
    let mut generator = PayloadGenerator::new();
    let mut failures = 0;

    for i in 0..count {
        let payload = if i == 0 {
            PayloadGenerator::reference()
        } else {
            generator.generate()
        };

        let response = client.post(&url).json(&payload).send().await?;
        let status = response.status();
        let body: Value = response.json().await?;

        if status.is_success() {
            check_response(&body);
            info!(
                allele = %payload.snp_risk_allele,
                status = status.as_u16(),
                risk = body.get("risk").and_then(serde_json::Value::as_f64),
                "Prediction received"
            );
        } else {
            failures += 1;
            warn!(
                allele = %payload.snp_risk_allele,
                status = status.as_u16(),
                body = %body,
                "Prediction request failed"
            );
        }

        if i + 1 < count {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }
    }

    info!("Completed! Sent {} requests ({} failed)", count, failures);

    Ok(())
}
