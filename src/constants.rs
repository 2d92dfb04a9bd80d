//! Global constants used throughout the mmm codebase.
//!
//! Timeouts, retry parameters, concurrency bounds and registry defaults that are
//! shared by several modules.

use std::time::Duration;

/// Timeout for registry metadata requests (15 seconds).
pub const METADATA_TIMEOUT: Duration = Duration::from_secs(15);

/// Timeout for mod file downloads (5 minutes).
///
/// Large modpacks can ship jars of several hundred megabytes.
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);

/// Number of retries for a registry request that failed with a 5xx status or a
/// connection error. Timeouts and cancellation are never retried.
pub const MAX_HTTP_RETRIES: usize = 3;

/// Starting delay for exponential retry backoff (250ms).
pub const STARTING_BACKOFF_DELAY_MS: u64 = 250;

/// Maximum backoff delay between retries (1 second).
pub const MAX_BACKOFF_DELAY_MS: u64 = 1_000;

/// Maximum number of registry requests in flight at once across the process.
pub const MAX_CONCURRENT_REQUESTS: usize = 8;

/// Concurrent per-candidate registry lookups during a scan.
pub const SCAN_LOOKUP_CONCURRENCY: usize = 4;

/// Chunk size for streaming file hashes (32 KiB).
///
/// Cancellation is checked between chunks.
pub const HASH_CHUNK_SIZE: usize = 32 * 1024;

/// Minimum parallelism for local file hashing.
pub const MIN_PARALLELISM: usize = 1;

/// Default Modrinth API base URL.
pub const MODRINTH_API_URL: &str = "https://api.modrinth.com";

/// Default CurseForge API base URL.
pub const CURSEFORGE_API_URL: &str = "https://api.curseforge.com/v1";

/// Minecraft's game id on CurseForge, used by the fingerprint endpoint.
pub const CURSEFORGE_MINECRAFT_GAME_ID: u32 = 432;

/// Mojang launcher version manifest.
pub const MINECRAFT_VERSION_MANIFEST_URL: &str =
    "https://launchermeta.mojang.com/mc/game/version_manifest.json";

/// Default config document file name.
pub const DEFAULT_CONFIG_FILE: &str = "modlist.json";

/// Ignore file looked up next to the config document.
pub const IGNORE_FILE: &str = ".mmmignore";

/// Pattern that is always ignored when scanning the mods folder.
pub const DEFAULT_IGNORE_PATTERN: &str = "**/*.disabled";
