//! Kernel compilation.
//!
//! The kernel source is parsed and validated with naga before it reaches
//! wgpu, so a broken kernel produces a rendered diagnostic instead of a device
//! error.

use std::fs;
use std::path::{Path, PathBuf};

use naga::valid::{Capabilities, ValidationFlags, Validator};

use super::{GpuError, ResolvedDevice};

/// Entry point used when none is configured.
pub const DEFAULT_ENTRY_POINT: &str = "life";
/// Pipeline-overridable constant the host sets to the partition group extent.
pub const GROUP_EXTENT_OVERRIDE: &str = "GROUP_EXTENT";

/// Bindings in group 0: side length, read generation, write generation.
const REQUIRED_BINDINGS: [u32; 3] = [0, 1, 2];

/// What the host needs to know about a validated kernel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelInterface {
    pub entry_point: String,
    /// Kernel declares `override GROUP_EXTENT: u32`.
    pub group_override: bool,
    /// Declared `@workgroup_size`, meaningful when `group_override` is false.
    pub workgroup_size: [u32; 3],
}

impl KernelInterface {
    /// Check the kernel can run with the given group extent.
    pub fn check_group_extent(&self, group_extent: u32) -> Result<(), GpuError> {
        if self.group_override || self.workgroup_size == [group_extent, group_extent, 1] {
            Ok(())
        } else {
            Err(GpuError::GroupExtentMismatch {
                declared: self.workgroup_size,
                group_extent,
            })
        }
    }
}

/// Read a kernel file, which must be UTF-8.
pub fn read_kernel_source(path: &Path) -> Result<String, GpuError> {
    let bytes = fs::read(path).map_err(|source| GpuError::KernelRead {
        path: path.to_path_buf(),
        source,
    })?;
    String::from_utf8(bytes).map_err(|_| GpuError::KernelEncoding {
        path: path.to_path_buf(),
    })
}

/// Parse and validate WGSL kernel source and extract its interface.
pub fn compile_kernel_source(source: &str, entry_point: &str) -> Result<KernelInterface, GpuError> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| GpuError::Compile {
        log: e.emit_to_string(source),
    })?;

    Validator::new(ValidationFlags::all(), Capabilities::all())
        .validate(&module)
        .map_err(|e| GpuError::Compile {
            log: e.emit_to_string(source),
        })?;

    let entry = module
        .entry_points
        .iter()
        .find(|ep| ep.name == entry_point && ep.stage == naga::ShaderStage::Compute)
        .ok_or_else(|| GpuError::MissingEntryPoint {
            name: entry_point.to_string(),
        })?;

    for binding in REQUIRED_BINDINGS {
        let declared = module.global_variables.iter().any(|(_, var)| {
            var.binding
                .as_ref()
                .is_some_and(|b| b.group == 0 && b.binding == binding)
        });
        if !declared {
            return Err(GpuError::MissingBinding { binding });
        }
    }

    let group_override = module
        .overrides
        .iter()
        .any(|(_, o)| o.name.as_deref() == Some(GROUP_EXTENT_OVERRIDE));

    Ok(KernelInterface {
        entry_point: entry_point.to_string(),
        group_override,
        workgroup_size: entry.workgroup_size,
    })
}

/// A kernel compiled for a resolved device.
pub struct CompiledProgram {
    pub module: wgpu::ShaderModule,
    pub interface: KernelInterface,
    pub path: PathBuf,
}

impl CompiledProgram {
    /// Read `path`, validate it and create a shader module on `device`.
    pub fn build(
        device: &ResolvedDevice,
        path: &Path,
        entry_point: &str,
    ) -> Result<Self, GpuError> {
        let source = read_kernel_source(path)?;
        let interface = compile_kernel_source(&source, entry_point)?;

        let module = device
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("Transition Kernel"),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            });

        log::info!(
            "Compiled kernel {} (entry `{}`, {})",
            path.display(),
            interface.entry_point,
            if interface.group_override {
                "overridable group extent".to_string()
            } else {
                format!("fixed workgroup {:?}", interface.workgroup_size)
            }
        );

        Ok(Self {
            module,
            interface,
            path: path.to_path_buf(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const KERNEL: &str = include_str!("../../../kernels/life.wgsl");

    const FIXED_KERNEL: &str = r#"
struct Params { side: u32, _pad0: u32, _pad1: u32, _pad2: u32 }
@group(0) @binding(0) var<uniform> params: Params;
@group(0) @binding(1) var<storage, read> source: array<u32>;
@group(0) @binding(2) var<storage, read_write> destination: array<u32>;

@compute @workgroup_size(4, 4, 1)
fn advance(@builtin(global_invocation_id) gid: vec3<u32>) {
    let i = gid.y * params.side + gid.x;
    destination[i] = source[i];
}
"#;

    #[test]
    fn test_read_kernel_source() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FIXED_KERNEL.as_bytes()).unwrap();

        let source = read_kernel_source(file.path()).unwrap();
        assert_eq!(source, FIXED_KERNEL);
        assert!(compile_kernel_source(&source, "advance").is_ok());
    }

    #[test]
    fn test_missing_kernel_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("life.wgsl");
        match read_kernel_source(&missing) {
            Err(GpuError::KernelRead { path, source }) => {
                assert_eq!(path, missing);
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            other => panic!("expected read error, got {:?}", other),
        }
    }

    #[test]
    fn test_kernel_file_not_utf8() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[0x40, 0xff, 0xfe, 0x00]).unwrap();
        assert!(matches!(
            read_kernel_source(file.path()),
            Err(GpuError::KernelEncoding { .. })
        ));
    }

    #[test]
    fn test_bundled_kernel_compiles() {
        let interface = compile_kernel_source(KERNEL, DEFAULT_ENTRY_POINT).unwrap();
        assert!(interface.group_override);
        assert!(interface.check_group_extent(1).is_ok());
        assert!(interface.check_group_extent(8).is_ok());
    }

    #[test]
    fn test_fixed_workgroup_must_match() {
        let interface = compile_kernel_source(FIXED_KERNEL, "advance").unwrap();
        assert!(!interface.group_override);
        assert_eq!(interface.workgroup_size, [4, 4, 1]);
        assert!(interface.check_group_extent(4).is_ok());
        assert!(matches!(
            interface.check_group_extent(8),
            Err(GpuError::GroupExtentMismatch {
                declared: [4, 4, 1],
                group_extent: 8
            })
        ));
    }

    #[test]
    fn test_syntax_error_reports_diagnostic() {
        let broken = "@compute @workgroup_size(1) fn life( {";
        match compile_kernel_source(broken, DEFAULT_ENTRY_POINT) {
            Err(GpuError::Compile { log }) => assert!(!log.is_empty()),
            other => panic!("expected compile error, got {:?}", other),
        }
    }

    #[test]
    fn test_validation_error_reports_diagnostic() {
        let invalid = r#"
@compute @workgroup_size(1)
fn life() {
    let x: u32 = 1.5;
}
"#;
        assert!(matches!(
            compile_kernel_source(invalid, DEFAULT_ENTRY_POINT),
            Err(GpuError::Compile { .. })
        ));
    }

    #[test]
    fn test_missing_entry_point() {
        assert!(matches!(
            compile_kernel_source(FIXED_KERNEL, "life"),
            Err(GpuError::MissingEntryPoint { name }) if name == "life"
        ));
    }

    #[test]
    fn test_missing_binding() {
        let no_destination = r#"
@group(0) @binding(0) var<uniform> side: vec4<u32>;
@group(0) @binding(1) var<storage, read> source: array<u32>;

@compute @workgroup_size(1)
fn life() {}
"#;
        assert!(matches!(
            compile_kernel_source(no_destination, "life"),
            Err(GpuError::MissingBinding { binding: 2 })
        ));
    }
}
