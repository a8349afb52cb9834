use crate::{classify::ClassifyOptions, flush::DEFAULT_FLUSH_ID_CHECK_INTERVAL};

use rollup_node_providers::RpcTrustedSequencerClient;
use std::time::Duration;

/// The default number of retries of a failed trusted sequencer request.
pub const DEFAULT_SEQUENCER_MAX_RETRIES: u32 = 10;

/// The default initial backoff of a failed trusted sequencer request, in milliseconds.
pub const DEFAULT_SEQUENCER_INITIAL_BACKOFF_MS: u64 = 100;

/// The trusted state synchronization arguments.
#[derive(Debug, Clone, clap::Args)]
pub struct TrustedSyncArgs {
    /// The URL of the trusted sequencer JSON-RPC endpoint.
    #[arg(long = "trusted-sync.sequencer-url", value_name = "URL")]
    pub sequencer_url: reqwest::Url,
    /// The maximum batch number to synchronize, passed to each synchronization pass.
    #[arg(long = "trusted-sync.max-batch-number", value_name = "BATCH_NUMBER", default_value_t = u64::MAX)]
    pub max_batch_number: u64,
    /// Replay an open batch from scratch once the trusted sequencer closes it.
    #[arg(long = "trusted-sync.reprocess-full-batch-on-close")]
    pub reprocess_full_batch_on_close: bool,
    /// Accept batches closed by the trusted sequencer without any transaction.
    #[arg(long = "trusted-sync.accept-empty-closed-batches")]
    pub accept_empty_closed_batches: bool,
    /// The interval between two checks of the executor stored flush id, in milliseconds.
    #[arg(
        long = "trusted-sync.flush-id-check-interval",
        value_name = "MILLISECONDS",
        default_value_t = DEFAULT_FLUSH_ID_CHECK_INTERVAL.as_millis() as u64
    )]
    pub flush_id_check_interval_ms: u64,
    /// The maximum number of retries of a failed trusted sequencer request.
    #[arg(long = "trusted-sync.sequencer-max-retries", value_name = "RETRIES", default_value_t = DEFAULT_SEQUENCER_MAX_RETRIES)]
    pub sequencer_max_retries: u32,
    /// The initial backoff of a failed trusted sequencer request, in milliseconds.
    #[arg(
        long = "trusted-sync.sequencer-initial-backoff",
        value_name = "MILLISECONDS",
        default_value_t = DEFAULT_SEQUENCER_INITIAL_BACKOFF_MS
    )]
    pub sequencer_initial_backoff_ms: u64,
}

impl TrustedSyncArgs {
    /// Returns the [`SyncConfig`] described by the arguments.
    pub const fn config(&self) -> SyncConfig {
        SyncConfig {
            flush_id_check_interval: Duration::from_millis(self.flush_id_check_interval_ms),
            classify: ClassifyOptions {
                reprocess_full_batch_on_close: self.reprocess_full_batch_on_close,
                accept_empty_closed_batches: self.accept_empty_closed_batches,
            },
        }
    }

    /// Returns a [`RpcTrustedSequencerClient`] for the configured endpoint.
    pub fn sequencer_client(&self) -> RpcTrustedSequencerClient {
        tracing::info!(target: "zkevm::synchronizer", url = %self.sequencer_url, "connecting to trusted sequencer");
        RpcTrustedSequencerClient::new_http(
            self.sequencer_url.clone(),
            self.sequencer_max_retries,
            self.sequencer_initial_backoff_ms,
        )
    }
}

/// Configuration for the trusted state synchronizer.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// The interval between two checks of the executor stored flush id.
    pub flush_id_check_interval: Duration,
    /// The options adjusting the classification of remote batches.
    pub classify: ClassifyOptions,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            flush_id_check_interval: DEFAULT_FLUSH_ID_CHECK_INTERVAL,
            classify: ClassifyOptions::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Debug, Parser)]
    struct Cli {
        #[command(flatten)]
        args: TrustedSyncArgs,
    }

    #[test]
    fn test_parse_defaults() {
        let cli =
            Cli::parse_from(["zkevm", "--trusted-sync.sequencer-url", "http://localhost:8123"]);
        assert_eq!(cli.args.config(), SyncConfig::default());
        assert_eq!(cli.args.max_batch_number, u64::MAX);
        assert_eq!(cli.args.sequencer_max_retries, DEFAULT_SEQUENCER_MAX_RETRIES);
    }

    #[test]
    fn test_parse_overrides() {
        let cli = Cli::parse_from([
            "zkevm",
            "--trusted-sync.sequencer-url",
            "http://localhost:8123",
            "--trusted-sync.max-batch-number",
            "42",
            "--trusted-sync.flush-id-check-interval",
            "250",
            "--trusted-sync.reprocess-full-batch-on-close",
            "--trusted-sync.accept-empty-closed-batches",
        ]);
        assert_eq!(cli.args.max_batch_number, 42);
        let config = cli.args.config();
        assert_eq!(config.flush_id_check_interval, Duration::from_millis(250));
        assert!(config.classify.reprocess_full_batch_on_close);
        assert!(config.classify.accept_empty_closed_batches);
    }
}
