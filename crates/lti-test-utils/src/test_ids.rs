//! Fixed identifiers for deterministic tests.

// Platform registration
pub const TEST_CLIENT_ID: &str = "10000000000001";
pub const TEST_DEPLOYMENT_ID: &str = "1:8865aa05b4b79b64a91a86042e43af5ea8ae79eb";
pub const TEST_ISSUER: &str = "https://canvas.test.instructure.com";

// Platform signing key ids
pub const TEST_PLATFORM_KID: &str = "platform-key-2024-01";
pub const TEST_OTHER_KID: &str = "platform-key-untrusted";

// Launch subjects
pub const TEST_SUBJECT_STUDENT: &str = "a6d5c443-1f51-4783-ba1a-7686ffe3b54a";
pub const TEST_SUBJECT_INSTRUCTOR: &str = "f3a8b1c2-0d4e-4f56-8a9b-7c6d5e4f3a2b";

// Tool endpoints as the platform knows them
pub const TEST_TOOL_URL: &str = "https://tool.test.edu";
pub const TEST_TOOL_LAUNCH_URL: &str = "https://tool.test.edu/lti/launch";
pub const TEST_TOOL_REDIRECT_URL: &str = "https://tool.test.edu/app";

// Correlation hash secret
pub const TEST_SECRET_KEY: &str = "test-secret-do-not-use-in-production";
