//! Credential resolution.
//!
//! Picks the media backend endpoint and key pair for a request from static
//! configuration. Tiers are tried in order and the first match wins:
//!
//! 1. explicit credential key
//! 2. `VOICE_LANGUAGE`
//! 3. `VOICE`
//! 4. the `default` entry of the JSON map
//! 5. the global `LIVEKIT_URL` / `LIVEKIT_API_KEY` / `LIVEKIT_API_SECRET` triple
//!
//! Tiers 1-3 look in the JSON map (exact key, then case-insensitive) and then
//! in the per-key `LIVEKIT_<KEY>_*` variables. A tier whose input is missing
//! or blank is skipped, and a tier that matches nothing falls through.

use crate::config::Config;
use crate::errors::VsError;
use crate::models::CredentialSet;
use crate::observability::metrics::record_credential_resolution;
use std::collections::HashMap;
use tracing::debug;

/// Reserved JSON map entry used when no key-specific entry matches.
pub const DEFAULT_CREDENTIAL_KEY: &str = "default";

/// Which resolution tier produced a credential set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionTier {
    ExplicitKey,
    VoiceLanguage,
    Voice,
    Default,
    Global,
}

impl ResolutionTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionTier::ExplicitKey => "explicit_key",
            ResolutionTier::VoiceLanguage => "voice_language",
            ResolutionTier::Voice => "voice",
            ResolutionTier::Default => "default",
            ResolutionTier::Global => "global",
        }
    }
}

/// Normalize a credential key: uppercase ASCII letters, keep digits and
/// `_`, replace everything else with `_`. Total and idempotent.
pub fn normalize_key(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Look a key up in the JSON map: exact match first, then the
/// lexicographically smallest case-insensitive match.
fn lookup_map<'a>(map: &'a HashMap<String, CredentialSet>, key: &str) -> Option<&'a CredentialSet> {
    if let Some(set) = map.get(key) {
        return Some(set);
    }

    map.iter()
        .filter(|(candidate, _)| candidate.eq_ignore_ascii_case(key))
        .min_by(|(a, _), (b, _)| a.cmp(b))
        .map(|(_, set)| set)
}

/// Look a normalized key up in the JSON map, then in the named variables.
fn lookup_key<'a>(config: &'a Config, key: &str) -> Option<&'a CredentialSet> {
    lookup_map(&config.credential_map, key).or_else(|| config.named_credentials.get(key))
}

/// Resolve credentials and report which tier matched.
pub fn resolve_with_tier(
    config: &Config,
    voice: Option<&str>,
    language: Option<&str>,
    explicit_key: Option<&str>,
) -> Result<(CredentialSet, ResolutionTier), VsError> {
    let voice = non_blank(voice);
    let language = non_blank(language);

    let mut candidates: Vec<(String, ResolutionTier)> = Vec::with_capacity(3);
    if let Some(key) = non_blank(explicit_key) {
        candidates.push((normalize_key(key), ResolutionTier::ExplicitKey));
    }
    if let (Some(voice), Some(language)) = (voice, language) {
        candidates.push((
            normalize_key(&format!("{voice}_{language}")),
            ResolutionTier::VoiceLanguage,
        ));
    }
    if let Some(voice) = voice {
        candidates.push((normalize_key(voice), ResolutionTier::Voice));
    }

    let found = candidates
        .iter()
        .find_map(|(key, tier)| lookup_key(config, key).map(|set| (set, *tier)))
        .or_else(|| {
            lookup_map(&config.credential_map, DEFAULT_CREDENTIAL_KEY)
                .map(|set| (set, ResolutionTier::Default))
        })
        .or_else(|| {
            config
                .global_credentials
                .as_ref()
                .map(|set| (set, ResolutionTier::Global))
        });

    match found {
        Some((set, tier)) => {
            debug!(
                target: "vs.credentials",
                tier = tier.as_str(),
                url = %set.url,
                "Resolved media credentials"
            );
            record_credential_resolution(tier.as_str());
            Ok((set.clone(), tier))
        }
        None => {
            record_credential_resolution("none");
            Err(VsError::CredentialsNotConfigured)
        }
    }
}

/// Resolve the credential set for a request.
pub fn resolve(
    config: &Config,
    voice: Option<&str>,
    language: Option<&str>,
    explicit_key: Option<&str>,
) -> Result<CredentialSet, VsError> {
    resolve_with_tier(config, voice, language, explicit_key).map(|(set, _)| set)
}
