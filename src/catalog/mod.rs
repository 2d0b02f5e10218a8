//! Package catalog
//!
//! The catalog is pure data: categories of [`PackageRecord`]s, built once at
//! startup (from the built-in table or a JSON file) and then only queried.
//! The one mutable bit is each category's `selected` flag, which belongs to
//! the front-end.
//!
//! # Design
//! Lookups scan categories in order and packages in order, so "first match"
//! is always stable and predictable for a given catalog.

mod builtin;

use crate::error::{Result, SetupError};
use crate::types::InstallMethod;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// One installable package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageRecord {
    /// Unique, stable identifier across the whole catalog
    pub id: String,
    /// Manager-specific package name
    pub name: String,
    pub display_name: String,
    pub method: InstallMethod,
    /// Install script URL (curl), `owner/repo` slug (github) or script path (script)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<String>,
    /// Extra CLI flags passed to the package manager (e.g. `--classic`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flags: Option<String>,
    /// Command name that appears on PATH once installed, when it differs from `name`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
}

impl PackageRecord {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        display_name: impl Into<String>,
        method: InstallMethod,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            display_name: display_name.into(),
            method,
            extra: None,
            flags: None,
            command: None,
        }
    }

    pub fn with_extra(mut self, extra: impl Into<String>) -> Self {
        self.extra = Some(extra.into());
        self
    }

    pub fn with_flags(mut self, flags: impl Into<String>) -> Self {
        self.flags = Some(flags.into());
        self
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    /// Name of the executable the package provides
    pub fn command_name(&self) -> &str {
        self.command.as_deref().unwrap_or(&self.name)
    }

    /// Extra payload, or an empty string
    pub fn extra_or_empty(&self) -> &str {
        self.extra.as_deref().unwrap_or("")
    }

    /// Flags followed by a space, or nothing, for splicing before the package name
    pub fn flags_prefix(&self) -> String {
        match self.flags.as_deref().map(str::trim) {
            Some(flags) if !flags.is_empty() => format!("{} ", flags),
            _ => String::new(),
        }
    }

    fn matches_term(&self, lowered: &str) -> bool {
        self.id == lowered
            || self.display_name.to_lowercase().contains(lowered)
            || self.name.to_lowercase().contains(lowered)
    }
}

/// A named group of packages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub selected: bool,
    pub packages: Vec<PackageRecord>,
}

/// Categories selected by [`Catalog::select_essentials`]
pub const ESSENTIAL_CATEGORIES: &[&str] = &[
    "essential",
    "languages",
    "editors",
    "terminal-emulators",
    "package-managers",
    "git-tools",
    "cli-utils",
    "curl-tools",
    "npm-tools",
];

/// Characters allowed in package names interpolated into shell commands
fn is_shell_safe(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "._+-@/:".contains(c))
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    categories: Vec<Category>,
}

impl Catalog {
    /// Build a catalog from categories, rejecting invalid data
    pub fn new(categories: Vec<Category>) -> Result<Self> {
        let catalog = Self { categories };
        catalog.validate()?;
        Ok(catalog)
    }

    /// The built-in workstation catalog
    pub fn builtin() -> Self {
        Self {
            categories: builtin::categories(),
        }
    }

    /// Load a catalog from a JSON array of categories
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            SetupError::catalog(format!("Failed to read catalog {}: {}", path.display(), e))
        })?;
        let categories: Vec<Category> = serde_json::from_str(&content)?;
        Self::new(categories)
    }

    /// Check id uniqueness and per-method field requirements
    pub fn validate(&self) -> Result<()> {
        let mut category_ids = HashSet::new();
        let mut package_ids = HashSet::new();

        for category in &self.categories {
            if category.id.trim().is_empty() {
                return Err(SetupError::catalog("Category id cannot be empty"));
            }
            if !category_ids.insert(category.id.as_str()) {
                return Err(SetupError::catalog(format!(
                    "Duplicate category id: {}",
                    category.id
                )));
            }

            for pkg in &category.packages {
                if pkg.id.trim().is_empty() {
                    return Err(SetupError::catalog(format!(
                        "Package with empty id in category {}",
                        category.id
                    )));
                }
                if !package_ids.insert(pkg.id.as_str()) {
                    return Err(SetupError::catalog(format!(
                        "Duplicate package id: {}",
                        pkg.id
                    )));
                }

                // Script packages are labelled by name; only the path is executed
                if pkg.method != InstallMethod::Script && !is_shell_safe(&pkg.name) {
                    return Err(SetupError::catalog(format!(
                        "Package {} has an invalid name: {:?}",
                        pkg.id, pkg.name
                    )));
                }

                let needs_extra = matches!(
                    pkg.method,
                    InstallMethod::Curl | InstallMethod::Github | InstallMethod::Script
                );
                if needs_extra && pkg.extra_or_empty().trim().is_empty() {
                    return Err(SetupError::catalog(format!(
                        "Package {} ({}) requires an extra value",
                        pkg.id, pkg.method
                    )));
                }
            }
        }

        Ok(())
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn category(&self, id: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    pub fn find_by_id(&self, id: &str) -> Option<&PackageRecord> {
        self.all_packages().find(|p| p.id == id)
    }

    /// First package whose id equals `term`, or whose name or display name
    /// contains it, ignoring case
    pub fn find_by_fuzzy_name(&self, term: &str) -> Option<(&Category, &PackageRecord)> {
        let lowered = term.trim().to_lowercase();
        if lowered.is_empty() {
            return None;
        }
        self.categories.iter().find_map(|category| {
            category
                .packages
                .iter()
                .find(|p| p.matches_term(&lowered))
                .map(|p| (category, p))
        })
    }

    pub fn all_packages(&self) -> impl Iterator<Item = &PackageRecord> {
        self.categories.iter().flat_map(|c| c.packages.iter())
    }

    /// Packages of all selected categories, in catalog order
    pub fn selected_packages(&self) -> Vec<PackageRecord> {
        self.categories
            .iter()
            .filter(|c| c.selected)
            .flat_map(|c| c.packages.iter().cloned())
            .collect()
    }

    pub fn select_all(&mut self) {
        self.categories.iter_mut().for_each(|c| c.selected = true);
    }

    pub fn select_none(&mut self) {
        self.categories.iter_mut().for_each(|c| c.selected = false);
    }

    /// Flip one category's selection, returning the new state
    pub fn toggle(&mut self, category_id: &str) -> Result<bool> {
        let category = self
            .categories
            .iter_mut()
            .find(|c| c.id == category_id)
            .ok_or_else(|| SetupError::UnknownCategory(category_id.to_string()))?;
        category.selected = !category.selected;
        Ok(category.selected)
    }

    /// Select exactly the given categories
    pub fn select_only(&mut self, category_ids: &[String]) -> Result<()> {
        if let Some(unknown) = category_ids.iter().find(|id| self.category(id).is_none()) {
            return Err(SetupError::UnknownCategory(unknown.clone()));
        }
        for category in &mut self.categories {
            category.selected = category_ids.contains(&category.id);
        }
        Ok(())
    }

    /// Add the core development categories to the selection
    pub fn select_essentials(&mut self) {
        for category in &mut self.categories {
            if ESSENTIAL_CATEGORIES.contains(&category.id.as_str()) {
                category.selected = true;
            }
        }
    }
}
