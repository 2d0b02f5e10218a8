//! Tests for the built-in catalog, catalog files and the method registry

use dotsetup::catalog::{Catalog, ESSENTIAL_CATEGORIES};
use dotsetup::methods::MethodRegistry;
use dotsetup::types::InstallMethod;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

#[test]
fn test_builtin_ids_are_unique() {
    let catalog = Catalog::builtin();
    let mut seen = HashSet::new();
    for pkg in catalog.all_packages() {
        assert!(seen.insert(pkg.id.clone()), "duplicate id {}", pkg.id);
    }
}

#[test]
fn test_essential_categories_exist() {
    let catalog = Catalog::builtin();
    for id in ESSENTIAL_CATEGORIES {
        assert!(catalog.category(id).is_some(), "missing category {}", id);
    }
}

#[test]
fn test_select_essentials_leaves_others_unselected() {
    let mut catalog = Catalog::builtin();
    catalog.select_essentials();
    for category in catalog.categories() {
        assert_eq!(
            category.selected,
            ESSENTIAL_CATEGORIES.contains(&category.id.as_str()),
            "{}",
            category.id
        );
    }
}

#[test]
fn test_every_builtin_package_has_commands() {
    let catalog = Catalog::builtin();
    let registry = MethodRegistry::standard(Path::new("/usr/local/bin"));

    for pkg in catalog.all_packages() {
        assert!(registry.supports(pkg.method), "{} has no handler", pkg.id);
        match pkg.method {
            InstallMethod::Github => assert!(registry.rollback_command(pkg).is_some()),
            InstallMethod::Script => assert!(registry.probe_command(pkg).is_none()),
            _ => assert!(registry.install_command(pkg).is_some(), "{}", pkg.id),
        }
    }
}

#[test]
fn test_catalog_file_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("catalog.json");
    let json = r#"[
        {
            "id": "editors",
            "name": "Editors",
            "description": "Code editors",
            "packages": [
                {"id": "code", "name": "code", "displayName": "VS Code", "method": "snap", "flags": "--classic"},
                {"id": "neovim", "name": "neovim", "displayName": "Neovim", "method": "apt", "command": "nvim"}
            ]
        }
    ]"#;
    fs::write(&path, json).unwrap();

    let catalog = Catalog::from_file(&path).unwrap();
    let code = catalog.find_by_id("code").unwrap();
    assert_eq!(code.method, InstallMethod::Snap);
    assert_eq!(code.flags.as_deref(), Some("--classic"));
    assert_eq!(catalog.find_by_id("neovim").unwrap().command_name(), "nvim");
    assert!(!catalog.category("editors").unwrap().selected);
}

#[test]
fn test_catalog_file_with_unknown_method_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("catalog.json");
    fs::write(
        &path,
        r#"[{"id": "x", "name": "X", "description": "", "packages": [
            {"id": "a", "name": "a", "displayName": "A", "method": "brew"}
        ]}]"#,
    )
    .unwrap();

    assert!(Catalog::from_file(&path).is_err());
}

#[test]
fn test_fuzzy_lookup_on_builtin() {
    let catalog = Catalog::builtin();
    let (_, pkg) = catalog.find_by_fuzzy_name("LazyGit").unwrap();
    assert_eq!(pkg.id, "lazygit");
}
