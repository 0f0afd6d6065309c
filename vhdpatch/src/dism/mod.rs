//! DISM invocations used for offline servicing.
//!
//! Every call passes `/English` so the marker lines in [`parse`] do not
//! depend on the host's display language.

pub mod parse;

use anyhow::Result;
use std::path::Path;

use crate::command_runner::{CommandRunner, ToolOutput};
use crate::config::FinishMode;

pub use parse::PackageApplicability;

/// Image index mounted from multi-image files; a VHD has exactly one.
pub const IMAGE_INDEX: u32 = 1;

pub struct Dism<'a> {
    runner: &'a dyn CommandRunner,
    program: String,
}

impl<'a> Dism<'a> {
    pub fn new(runner: &'a dyn CommandRunner, program: &str) -> Self {
        Self {
            runner,
            program: program.to_string(),
        }
    }

    fn run(&self, args: Vec<String>) -> Result<ToolOutput> {
        let mut full = Vec::with_capacity(args.len() + 1);
        full.push("/English".to_string());
        full.extend(args);
        self.runner.run_output(&self.program, &full)
    }

    /// True if `/Get-MountedImageInfo` lists `mount_dir`.
    pub fn is_mounted(&self, mount_dir: &Path) -> Result<bool> {
        let output = self.run(vec!["/Get-MountedImageInfo".to_string()])?;
        Ok(parse::lists_mount_dir(&output, mount_dir))
    }

    pub fn mount(&self, image: &Path, mount_dir: &Path) -> Result<ToolOutput> {
        self.run(vec![
            "/Mount-Image".to_string(),
            format!("/ImageFile:{}", image.display()),
            format!("/Index:{IMAGE_INDEX}"),
            format!("/MountDir:{}", mount_dir.display()),
        ])
    }

    pub fn package_info(&self, mount_dir: &Path, package: &Path) -> Result<ToolOutput> {
        self.run(vec![
            format!("/Image:{}", mount_dir.display()),
            "/Get-PackageInfo".to_string(),
            format!("/PackagePath:{}", package.display()),
        ])
    }

    pub fn add_package(&self, mount_dir: &Path, package: &Path) -> Result<ToolOutput> {
        self.run(vec![
            format!("/Image:{}", mount_dir.display()),
            "/Add-Package".to_string(),
            format!("/PackagePath:{}", package.display()),
        ])
    }

    pub fn unmount(&self, mount_dir: &Path, mode: FinishMode) -> Result<ToolOutput> {
        self.run(vec![
            "/Unmount-Image".to_string(),
            format!("/MountDir:{}", mount_dir.display()),
            mode.dism_switch().to_string(),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command_runner::testing::MockCommandRunner;

    #[test]
    fn test_mount_arguments() {
        let runner = MockCommandRunner::new();
        let dism = Dism::new(&runner, "dism.exe");
        dism.mount(Path::new("base.vhdx"), Path::new("mnt")).unwrap();

        let calls = runner.calls();
        let call = &calls[0];
        assert_eq!(call.program, "dism.exe");
        assert_eq!(
            call.args,
            ["/English", "/Mount-Image", "/ImageFile:base.vhdx", "/Index:1", "/MountDir:mnt"]
        );
    }

    #[test]
    fn test_unmount_uses_finish_mode() {
        let runner = MockCommandRunner::new();
        let dism = Dism::new(&runner, "dism.exe");
        dism.unmount(Path::new("mnt"), FinishMode::Discard).unwrap();
        dism.unmount(Path::new("mnt"), FinishMode::Commit).unwrap();

        assert_eq!(runner.count("/Discard"), 1);
        assert_eq!(runner.count("/Commit"), 1);
    }

    #[test]
    fn test_package_commands_target_mounted_image() {
        let runner = MockCommandRunner::new();
        let dism = Dism::new(&runner, "dism.exe");
        dism.package_info(Path::new("mnt"), Path::new("kb.cab")).unwrap();
        dism.add_package(Path::new("mnt"), Path::new("kb.cab")).unwrap();

        for call in runner.calls() {
            assert!(call.has_arg("/Image:mnt"));
            assert!(call.has_arg("/PackagePath:kb.cab"));
        }
        assert_eq!(runner.count("/Get-PackageInfo"), 1);
        assert_eq!(runner.count("/Add-Package"), 1);
    }

    #[test]
    fn test_is_mounted_reads_listing() {
        let runner = MockCommandRunner::new().respond(
            "/Get-MountedImageInfo",
            ToolOutput::ok("Mount Dir : mnt\r\nStatus : Ok\r\n"),
        );
        let dism = Dism::new(&runner, "dism.exe");
        assert!(dism.is_mounted(Path::new("mnt")).unwrap());
        assert!(!dism.is_mounted(Path::new("other")).unwrap());
    }
}
