// ABOUTME: Property tests for deploy request validation.
// ABOUTME: Exactly one input mode must be chosen, and flags never change silently.

use orgdeploy::deploy::{ConfigurationError, DeployFlags, DeployRequest, InputMode};
use orgdeploy::types::{DeployId, MetadataName};
use proptest::prelude::*;
use std::path::PathBuf;
use std::time::Duration;

fn flags_with_modes(manifest: bool, metadata: bool, source: bool, replay: bool) -> DeployFlags {
    DeployFlags {
        manifest: manifest.then(|| PathBuf::from("manifest/package.xml")),
        metadata: if metadata {
            vec![MetadataName::new("ApexClass:Foo").unwrap()]
        } else {
            Vec::new()
        },
        source_paths: if source {
            vec![PathBuf::from("force-app/main/default/classes")]
        } else {
            Vec::new()
        },
        validated_deploy_request_id: replay.then(|| DeployId::new("0Af000000000001").unwrap()),
        wait_minutes: 33,
        ..DeployFlags::default()
    }
}

proptest! {
    /// Any combination of input flags resolves iff exactly one is set.
    #[test]
    fn prop_exactly_one_input_mode(
        manifest in any::<bool>(),
        metadata in any::<bool>(),
        source in any::<bool>(),
        replay in any::<bool>(),
    ) {
        let active = [manifest, metadata, source, replay].iter().filter(|b| **b).count();
        let result = DeployRequest::from_flags(flags_with_modes(manifest, metadata, source, replay));

        match active {
            0 => prop_assert_eq!(result.unwrap_err(), ConfigurationError::NoInputMode),
            1 => {
                let request = result.unwrap();
                let matches_flag = match request.mode {
                    InputMode::Manifest(_) => manifest,
                    InputMode::Metadata(_) => metadata,
                    InputMode::SourcePaths(_) => source,
                    InputMode::ValidatedReplay(_) => replay,
                };
                prop_assert!(matches_flag);
            }
            n => {
                let err = result.unwrap_err();
                prop_assert!(
                    matches!(&err, ConfigurationError::ConflictingInputModes(modes) if modes.len() == n),
                    "unexpected error: {err:?}"
                );
            }
        }
    }

    /// Wait minutes convert to a duration, and only zero is asynchronous.
    #[test]
    fn prop_wait_maps_to_duration(wait in 0u64..10_000) {
        let request = DeployRequest::from_flags(DeployFlags {
            wait_minutes: wait,
            ..flags_with_modes(false, true, false, false)
        })
        .unwrap();

        prop_assert_eq!(request.wait, Duration::from_secs(wait * 60));
        prop_assert_eq!(request.is_async(), wait == 0);
    }

    /// Rollback on error is the inverse of --ignore-errors for every mode.
    #[test]
    fn prop_ignore_errors_disables_rollback(ignore in any::<bool>(), mode in 0usize..4) {
        let modes = [
            flags_with_modes(true, false, false, false),
            flags_with_modes(false, true, false, false),
            flags_with_modes(false, false, true, false),
            flags_with_modes(false, false, false, true),
        ];
        let request = DeployRequest::from_flags(DeployFlags {
            ignore_errors: ignore,
            ..modes[mode].clone()
        })
        .unwrap();

        prop_assert_eq!(request.options.rollback_on_error, !ignore);
    }
}

#[test]
fn tracking_is_rejected_for_replay_and_check_only() {
    let replay = DeployRequest::from_flags(DeployFlags {
        track_source: true,
        ..flags_with_modes(false, false, false, true)
    });
    assert_eq!(
        replay.unwrap_err(),
        ConfigurationError::TrackingIncompatible("--validated-deploy-request-id")
    );

    let check_only = DeployRequest::from_flags(DeployFlags {
        track_source: true,
        check_only: true,
        ..flags_with_modes(false, true, false, false)
    });
    assert_eq!(
        check_only.unwrap_err(),
        ConfigurationError::TrackingIncompatible("--check-only")
    );
}
