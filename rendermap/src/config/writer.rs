//! INI serialization logic for converting `ConfigFile` → INI string.

use std::fmt;
use std::path::Path;

use super::settings::ConfigFile;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    format!(
        r#"[benchmark]
; Number of elements in the rendered collection (default: 1024)
; Overridden by -n on the command line
size = {}
; Dispatch rounds over all partitions (default: 1)
; Overridden by -i on the command line
iterations = {}
; Aliasing partitions, one worker task each per round (default: 4)
; Overridden by -p on the command line
partitions = {}
; Side length of each element's RGB texture (default: 512)
; One element holds side x side x 24 bytes
texture_side = {}

[machine]
; Simulated nodes (default: 1). Overridden by -ll:nodes
nodes = {}
; Application processors per node (default: 4). Overridden by -ll:cpu
cpus_per_node = {}
; System memories per node (default: 1)
; The placement policy requires exactly one and refuses to start otherwise
system_memories_per_node = {}
; Leaf tasks each processor runs at once (default: 1)
processor_slots = {}

[logging]
; Log file path (default: ~/.rendermap/rendermap.log)
file = {}
"#,
        config.benchmark.size,
        config.benchmark.iterations,
        config.benchmark.partitions,
        config.benchmark.texture_side,
        config.machine.nodes,
        config.machine.cpus_per_node,
        config.machine.system_memories_per_node,
        config.machine.processor_slots,
        path_to_string(&config.logging.file),
    )
}

fn path_to_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Renders the configuration exactly as it would be saved.
impl fmt::Display for ConfigFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&to_config_string(self))
    }
}
