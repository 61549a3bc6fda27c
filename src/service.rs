//! Newline-delimited JSON request/response loop.
//!
//! One record in, one record out, flushed before the next line is read. A failing
//! request is answered with an error record and never stops the loop.
use std::io::{self, BufRead, Write};

use log::{error, info};
use thiserror::Error;

use crate::analysis::{analyze_slices, AnalysisConfig, AnalysisError, AnalysisResult};
use crate::types::{ComputeRequest, Request, Response};

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("invalid request: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

pub struct Service {
    config: AnalysisConfig,
}

impl Service {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Answer one line; blank lines get no answer.
    pub fn handle_line(&self, line: &str) -> Option<Response> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let response = match self.process(line) {
            Ok(response) => response,
            Err(err) => {
                error!("request failed: {}", err);
                Response::Error {
                    err: err.to_string(),
                }
            }
        };
        Some(response)
    }

    fn process(&self, line: &str) -> Result<Response, RequestError> {
        let request: Request = serde_json::from_str(line)?;
        match request {
            Request::Ping => Ok(Response::Ready),
            Request::Compute(compute) => {
                let payload = self.compute(&compute)?;
                Ok(Response::Result { payload })
            }
        }
    }

    pub fn compute(&self, request: &ComputeRequest) -> Result<AnalysisResult, AnalysisError> {
        let config = match request.sfreq {
            Some(rate) => self.config.clone().with_sample_rate(rate),
            None => self.config.clone(),
        };
        analyze_slices(
            &request.eeg,
            &request.eogl,
            &request.eogr,
            &request.m1,
            &config,
        )
    }

    /// Announce readiness, then serve until `reader` is exhausted. Returns the
    /// number of records answered.
    pub fn run<R: BufRead, W: Write>(&self, reader: R, mut writer: W) -> io::Result<usize> {
        write_response(&mut writer, &Response::Ready)?;
        info!("service ready");
        let mut answered = 0;
        for line in reader.lines() {
            let line = line?;
            if let Some(response) = self.handle_line(&line) {
                write_response(&mut writer, &response)?;
                answered += 1;
            }
        }
        info!("input closed after {} records", answered);
        Ok(answered)
    }
}

fn write_response<W: Write>(writer: &mut W, response: &Response) -> io::Result<()> {
    serde_json::to_writer(&mut *writer, response)?;
    writer.write_all(b"\n")?;
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use std::f64::consts::PI;
    use std::io::Cursor;

    fn compute_line(eeg: &[f64], reference: &[f64], sfreq: Option<f64>) -> String {
        let zeros = vec![0.0; eeg.len()];
        let mut request = serde_json::json!({
            "cmd": "compute",
            "eeg": eeg,
            "eogl": zeros,
            "eogr": zeros,
            "m1": reference,
        });
        if let Some(rate) = sfreq {
            request["sfreq"] = rate.into();
        }
        request.to_string()
    }

    fn run(input: &str) -> Vec<Value> {
        let mut output = Vec::new();
        Service::new(AnalysisConfig::default())
            .run(Cursor::new(input.to_string()), &mut output)
            .unwrap();
        String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn answers_every_compute_and_survives_errors() {
        let alpha: Vec<f64> = (0..1250)
            .map(|i| 20.0 * (2.0 * PI * 10.0 * i as f64 / 250.0).sin())
            .collect();
        let zeros = vec![0.0; 1250];
        let input = format!(
            "{}\n\nnot json\n{}\n{}\n",
            compute_line(&alpha, &zeros, None),
            compute_line(&alpha, &zeros[..10], None),
            compute_line(&alpha, &zeros, Some(250.0)),
        );
        let records = run(&input);
        assert_eq!(records.len(), 5);
        assert_eq!(records[0]["type"], "ready");
        assert_eq!(records[1]["type"], "result");
        assert!(records[1]["payload"]["alpha"].as_f64().unwrap() > 0.5);
        assert_eq!(records[2]["type"], "error");
        assert!(records[2]["err"].as_str().unwrap().starts_with("invalid request"));
        assert_eq!(records[3]["type"], "error");
        assert!(records[3]["err"].as_str().unwrap().contains("reference"));
        assert_eq!(records[4], records[1]);
    }

    #[test]
    fn silent_input_reports_finite_ratios() {
        let zeros = vec![0.0; 1250];
        let records = run(&format!("{}\n", compute_line(&zeros, &zeros, None)));
        let payload = &records[1]["payload"];
        for band in ["gamma", "beta", "alpha", "theta", "delta"] {
            let value = payload[band].as_f64().unwrap();
            assert!((0.0..=1.0).contains(&value));
        }
        // 0 / 0 scores carry no number.
        assert!(payload["focus"].is_null());
    }

    #[test]
    fn ping_and_unknown_commands() {
        let records = run("{\"cmd\":\"ping\"}\n{\"cmd\":\"calibrate\"}\n");
        assert_eq!(records[1]["type"], "ready");
        assert_eq!(records[2]["type"], "error");
    }

    #[test]
    fn rate_override_is_per_request() {
        let service = Service::new(AnalysisConfig::default());
        let request = ComputeRequest {
            eeg: vec![0.0; 600],
            eogl: vec![0.0; 600],
            eogr: vec![0.0; 600],
            m1: vec![0.0; 600],
            sfreq: Some(80.0),
        };
        // 45 Hz band edge is above the 40 Hz Nyquist of an 80 Hz recording.
        assert!(matches!(
            service.compute(&request),
            Err(AnalysisError::InvalidCutoff { .. })
        ));
        assert_eq!(service.config().sample_rate_hz, 250.0);
    }
}
