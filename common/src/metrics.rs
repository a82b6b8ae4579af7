use metrics::{describe_gauge, gauge};

pub fn component_info_metric(name: &'static str) {
    static NAME: &str = "seed_validation_component_info";

    describe_gauge!(NAME, "Basic information about the component");

    let git_rev = option_env!("GIT_VERSION").unwrap_or("unknown");
    gauge!(NAME, "component" => name, "git_version" => git_rev).set(1);
}

pub mod metric_names {
    use const_format::concatcp;

    pub const METRIC_NAME_PREFIX: &str = "seed_validation_";

    pub const FAILURES: &str = concatcp!(METRIC_NAME_PREFIX, "failures");
    pub const FILES_READ: &str = concatcp!(METRIC_NAME_PREFIX, "files_read");
    pub const EVENTS_PROCESSED: &str = concatcp!(METRIC_NAME_PREFIX, "events_processed");
    pub const MATCHES_FILED: &str = concatcp!(METRIC_NAME_PREFIX, "matches_filed");
    pub const DUPLICATES_SUPPRESSED: &str =
        concatcp!(METRIC_NAME_PREFIX, "duplicates_suppressed");
    pub const MATCHES_REJECTED: &str = concatcp!(METRIC_NAME_PREFIX, "matches_rejected");
}

pub mod matches_filed {
    #[derive(Debug, Clone, Copy, Eq, Hash, PartialEq, strum::Display)]
    pub enum PolicyKind {
        #[strum(to_string = "seed_type")]
        SeedType,
        #[strum(to_string = "driven_fraction")]
        DrivenFraction,
        #[strum(to_string = "efficiency")]
        Efficiency,
    }

    // Label building function
    pub fn get_label(policy_kind: PolicyKind) -> (&'static str, String) {
        ("policy", policy_kind.to_string())
    }
}

pub mod failures {
    #[derive(Debug, Clone, Copy, Eq, Hash, PartialEq)]
    pub enum FailureKind {
        FileReadFailed,
        FileWriteFailed,
        InputContractViolation,
        UnableToDecodeEvent,
    }

    // Label building function
    pub fn get_label(failure_kind: FailureKind) -> (&'static str, &'static str) {
        (
            "failure_kind",
            match failure_kind {
                FailureKind::FileReadFailed => "file_read_failed",
                FailureKind::FileWriteFailed => "file_write_failed",
                FailureKind::InputContractViolation => "input_contract_violation",
                FailureKind::UnableToDecodeEvent => "unable_to_decode_event",
            },
        )
    }
}
