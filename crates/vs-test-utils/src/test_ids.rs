//! Fixed test ids and secrets for deterministic tests.

// User ids
pub const TEST_UID_ALICE: &str = "alice-0001";
pub const TEST_UID_BOB: &str = "bob-0002";
pub const TEST_UID_E2E: &str = "abc123";

// Accounts
pub const TEST_ALICE_NAME: &str = "Alice";
pub const TEST_ALICE_MAIL: &str = "alice@example.com";
pub const TEST_ALICE_PHONE: &str = "13800000001";
pub const TEST_ALICE_PASSWORD: &str = "correct horse battery staple";

// Secrets
pub const TEST_SIGNING_SECRET: &str = "test-signing-secret-do-not-use-in-production";
pub const TEST_METADATA_API_KEY: &str = "test-metadata-key-do-not-use-in-production";

// Credential map entries
pub const TEST_YUE_URL: &str = "wss://yue.media.test";
pub const TEST_YUE_API_KEY: &str = "yue-api-key";
pub const TEST_YUE_API_SECRET: &str = "yue-api-secret-do-not-use-in-production";
pub const TEST_DEFAULT_URL: &str = "wss://default.media.test";
pub const TEST_DEFAULT_API_KEY: &str = "default-api-key";
pub const TEST_DEFAULT_API_SECRET: &str = "default-api-secret-do-not-use-in-production";
