//! INI serialization: produces the commented text written to `config.ini`.

use super::settings::ConfigFile;

/// Converts a `ConfigFile` to a commented INI string.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let scheduler = &config.scheduler;
    let remote = &config.remote;

    format!(
        r#"[scheduler]
; Worker threads decoding local map files (0 disables local rendering)
local_workers = {}
; Worker threads downloading remote tiles (0 disables remote fetching)
remote_workers = {}
; Prefix for worker thread names
thread_name_prefix = {}

[cache]
; Index blocks kept in memory per map file
index_capacity = {}

[remote]
; Tile URL: <protocol>://<host><base_path>/<zoom>/<column>/<row>.<extension>
protocol = {}
host = {}
base_path = {}
extension = {}
min_zoom = {}
max_zoom = {}
; Parallel requests the server tolerates
parallel_requests = {}
; Request timeout in seconds
timeout = {}
user_agent = {}
"#,
        scheduler.local_workers,
        scheduler.remote_workers,
        scheduler.thread_name_prefix,
        config.cache.capacity,
        remote.protocol,
        remote.host,
        remote.base_path,
        remote.extension,
        remote.min_zoom,
        remote.max_zoom,
        remote.parallel_requests,
        remote.timeout_secs,
        remote.user_agent,
    )
}
