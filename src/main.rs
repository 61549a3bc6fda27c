// src/main.rs
use std::fs;
use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use log::info;

use focus_relax::analysis::AnalysisConfig;
use focus_relax::service::Service;

/// Scores focus and relaxation from four-channel EEG/EOG segments read as JSON lines on stdin.
#[derive(Parser, Debug)]
#[command(name = "focus-relax", version, about, long_about = None)]
struct Cli {
    /// JSON file with any subset of the analysis options; flags below take precedence
    #[arg(long)]
    config: Option<PathBuf>,

    /// Sampling rate in Hz
    #[arg(long)]
    sfreq: Option<f64>,

    /// Band-pass lower edge in Hz
    #[arg(long)]
    lowcut: Option<f64>,

    /// Band-pass upper edge in Hz
    #[arg(long)]
    highcut: Option<f64>,

    /// Mains frequency to notch out, in Hz
    #[arg(long)]
    notch: Option<f64>,

    /// Welch segment length in samples
    #[arg(long)]
    nperseg: Option<usize>,

    /// Welch segment overlap as a fraction of the segment length
    #[arg(long)]
    overlap: Option<f64>,

    #[arg(long)]
    base_focus: Option<f64>,

    #[arg(long)]
    base_relax: Option<f64>,

    #[arg(long)]
    focus_gain: Option<f64>,

    #[arg(long)]
    relax_gain: Option<f64>,

    /// Trust weight of the EEG channel in the fused ratios
    #[arg(long)]
    eeg_weight: Option<f64>,
}

impl Cli {
    fn load_config(&self) -> Result<AnalysisConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("reading config {}", path.display()))?;
                serde_json::from_str(&text)
                    .with_context(|| format!("parsing config {}", path.display()))?
            }
            None => AnalysisConfig::default(),
        };
        // 命令行参数覆盖配置文件
        let overrides = [
            (self.sfreq, &mut config.sample_rate_hz),
            (self.lowcut, &mut config.lowcut_hz),
            (self.highcut, &mut config.highcut_hz),
            (self.notch, &mut config.notch_hz),
            (self.overlap, &mut config.overlap),
            (self.base_focus, &mut config.base_focus),
            (self.base_relax, &mut config.base_relax),
            (self.focus_gain, &mut config.focus_gain),
            (self.relax_gain, &mut config.relax_gain),
            (self.eeg_weight, &mut config.eeg_weight),
        ];
        for (value, slot) in overrides {
            if let Some(value) = value {
                *slot = value;
            }
        }
        if let Some(nperseg) = self.nperseg {
            config.nperseg = nperseg;
        }
        config.validate().context("invalid analysis configuration")?;
        Ok(config)
    }
}

// 入口函数
fn main() -> Result<()> {
    // 日志输出到 stderr，stdout 只留给协议
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let config = cli.load_config()?;
    info!(
        "starting at {} Hz, band-pass {}-{} Hz, notch {} Hz",
        config.sample_rate_hz, config.lowcut_hz, config.highcut_hz, config.notch_hz
    );

    let stdin = io::stdin();
    let stdout = io::stdout();
    let answered = Service::new(config)
        .run(stdin.lock(), stdout.lock())
        .context("serving requests")?;
    info!("stopped after {} responses", answered);
    Ok(())
}
