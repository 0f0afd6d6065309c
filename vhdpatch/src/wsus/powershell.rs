//! WSUS backend driving the .NET administration API through PowerShell.
//!
//! Each operation runs one short script that loads the administration
//! assembly, connects with `AdminProxy.GetUpdateServer`, and prints JSON.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use super::{TargetGroup, UpdateRecord, UpdateScope, UpdateServer};
use crate::command_runner::{CommandRunner, ToolOutput};
use crate::error::PatchError;

const POWERSHELL: &str = "powershell.exe";

pub struct PowerShellUpdateServer<'a> {
    runner: &'a dyn CommandRunner,
    admin_library: PathBuf,
    host: String,
    port: u16,
    use_ssl: bool,
}

impl<'a> PowerShellUpdateServer<'a> {
    pub fn connect(
        runner: &'a dyn CommandRunner,
        admin_library: &Path,
        host: &str,
        port: u16,
        use_ssl: bool,
    ) -> Self {
        Self {
            runner,
            admin_library: admin_library.to_path_buf(),
            host: host.to_string(),
            port,
            use_ssl,
        }
    }

    fn preamble(&self) -> String {
        format!(
            "$ErrorActionPreference = 'Stop'\n\
             Add-Type -Path {library}\n\
             $wsus = [Microsoft.UpdateServices.Administration.AdminProxy]::GetUpdateServer({host}, ${ssl}, {port})\n",
            library = quote(&self.admin_library.to_string_lossy()),
            host = quote(&self.host),
            ssl = self.use_ssl,
            port = self.port,
        )
    }

    fn groups_script(&self) -> String {
        format!(
            "{}$groups = @($wsus.GetComputerTargetGroups() | ForEach-Object {{ \
             [pscustomobject]@{{ Id = $_.Id.ToString(); Name = $_.Name }} }})\n\
             ConvertTo-Json -InputObject $groups -Compress\n",
            self.preamble()
        )
    }

    fn updates_script(&self, scope: &UpdateScope) -> String {
        let mut script = self.preamble();
        script.push_str("$scope = New-Object Microsoft.UpdateServices.Administration.UpdateScope\n");
        if scope.approved_only() {
            script.push_str(
                "$scope.ApprovedStates = \
                 [Microsoft.UpdateServices.Administration.ApprovedStates]::LatestRevisionApproved\n",
            );
        }
        for id in scope.target_groups() {
            script.push_str(&format!(
                "[void]$scope.ApprovedComputerTargetGroups.Add($wsus.GetComputerTargetGroup([guid]{}))\n",
                quote(id)
            ));
        }
        script.push_str(
            "$updates = @($wsus.GetUpdates($scope) | ForEach-Object {\n\
             \x20   $files = @($_.GetInstallableItems() | ForEach-Object { $_.Files } | ForEach-Object { \
             [pscustomobject]@{ Uri = $_.FileUri.ToString(); Name = $_.Name } })\n\
             \x20   [pscustomobject]@{ Title = $_.Title; Files = $files }\n\
             })\n\
             ConvertTo-Json -InputObject $updates -Depth 4 -Compress\n",
        );
        script
    }

    fn run_script(&self, script: String) -> Result<ToolOutput> {
        let args = vec![
            "-NoProfile".to_string(),
            "-NonInteractive".to_string(),
            "-Command".to_string(),
            script,
        ];
        let output = self.runner.run_output(POWERSHELL, &args)?;
        if !output.success {
            let detail = if output.stderr.trim().is_empty() {
                output.stdout.trim()
            } else {
                output.stderr.trim()
            };
            return Err(PatchError::UpdateQuery {
                message: format!("{}:{}: {detail}", self.host, self.port),
            }
            .into());
        }
        Ok(output)
    }
}

impl UpdateServer for PowerShellUpdateServer<'_> {
    fn target_groups(&self) -> Result<Vec<TargetGroup>> {
        let output = self.run_script(self.groups_script())?;
        parse_json(&output.stdout).context("Failed to parse target group list")
    }

    fn updates(&self, scope: &UpdateScope) -> Result<Vec<UpdateRecord>> {
        let output = self.run_script(self.updates_script(scope))?;
        parse_json(&output.stdout).context("Failed to parse update list")
    }
}

/// Single-quoted PowerShell literal.
fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn parse_json<T: serde::de::DeserializeOwned>(stdout: &str) -> Result<Vec<T>, PatchError> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(trimmed)?)
}
