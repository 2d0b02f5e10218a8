//! Built-in workstation catalog

use super::{Category, PackageRecord};
use crate::types::InstallMethod::{self, Apt, Curl, Github, Npm, Script, Snap};

fn pkg(id: &str, display_name: &str, method: InstallMethod) -> PackageRecord {
    PackageRecord::new(id, id, display_name, method)
}

fn apt(id: &str, display_name: &str) -> PackageRecord {
    pkg(id, display_name, Apt)
}

fn snap(id: &str, display_name: &str) -> PackageRecord {
    pkg(id, display_name, Snap)
}

fn curl(id: &str, display_name: &str, url: &str) -> PackageRecord {
    pkg(id, display_name, Curl).with_extra(url)
}

fn github(id: &str, display_name: &str, repo: &str) -> PackageRecord {
    pkg(id, display_name, Github).with_extra(repo)
}

fn script(id: &str, label: &str, display_name: &str, path: &str) -> PackageRecord {
    PackageRecord::new(id, label, display_name, Script).with_extra(path)
}

fn category(id: &str, name: &str, description: &str, packages: Vec<PackageRecord>) -> Category {
    Category {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        selected: false,
        packages,
    }
}

pub(super) fn categories() -> Vec<Category> {
    vec![
        category(
            "essential",
            "Essential Packages",
            "Core system packages required for development",
            vec![
                apt("git", "Git"),
                apt("curl", "cURL"),
                apt("wget", "wget"),
                apt("build-essential", "Build Essential"),
                apt("ca-certificates", "CA Certificates"),
                apt("gnupg", "GnuPG"),
                apt("software-properties-common", "Software Properties Common"),
                apt("fish", "Fish Shell"),
            ],
        ),
        category(
            "languages",
            "Programming Languages",
            "Programming languages and runtimes",
            vec![
                apt("python3", "Python 3"),
                apt("python3-pip", "Python pip"),
                apt("python3-venv", "Python venv"),
                apt("nodejs", "Node.js"),
                apt("zig", "Zig Programming Language"),
            ],
        ),
        category(
            "editors",
            "Code Editors",
            "Text editors and IDEs",
            vec![
                apt("neovim", "Neovim").with_command("nvim"),
                apt("vim", "Vim"),
                snap("code", "Visual Studio Code").with_flags("--classic"),
            ],
        ),
        category(
            "terminal-emulators",
            "Terminal Emulators",
            "Modern terminal emulators",
            vec![
                apt("kitty", "Kitty Terminal"),
                github("ghostty", "Ghostty Terminal", "ghostty-org/ghostty"),
            ],
        ),
        category(
            "package-managers",
            "Package Managers",
            "Additional package managers",
            vec![
                apt("npm", "npm (Node Package Manager)"),
                curl("pnpm", "pnpm", "https://get.pnpm.io/install.sh"),
                curl("bun", "Bun", "https://bun.sh/install"),
            ],
        ),
        category(
            "git-tools",
            "Git Tools",
            "Git utilities and helpers",
            vec![
                apt("gh", "GitHub CLI"),
                github("lazygit", "lazygit", "jesseduffield/lazygit"),
                github("lazydocker", "lazydocker", "jesseduffield/lazydocker"),
            ],
        ),
        category(
            "cli-utils",
            "CLI Utilities",
            "Modern command-line tools",
            vec![
                apt("ripgrep", "ripgrep").with_command("rg"),
                apt("fd-find", "fd").with_command("fdfind"),
                apt("fzf", "fzf"),
                apt("zoxide", "zoxide"),
                apt("eza", "eza"),
                apt("bat", "bat"),
                apt("htop", "htop"),
                apt("tree", "tree"),
                apt("jq", "jq"),
                apt("unzip", "unzip"),
                apt("zip", "zip"),
                apt("xclip", "xclip"),
                apt("wl-clipboard", "wl-clipboard"),
                apt("bc", "bc"),
                apt("libnotify-bin", "libnotify-bin"),
            ],
        ),
        category(
            "browsers",
            "Web Browsers",
            "Web browsers",
            vec![
                snap("firefox", "Firefox"),
                apt("zen-browser", "Zen Browser"),
                apt("microsoft-edge-stable", "Microsoft Edge"),
                apt("brave-browser", "Brave Browser"),
            ],
        ),
        category(
            "communication",
            "Communication Apps",
            "Chat and communication applications",
            vec![
                snap("whatsapp-for-linux", "WhatsApp"),
                snap("signal-desktop", "Signal"),
                snap("simplenote", "Simplenote"),
                snap("discord", "Discord"),
            ],
        ),
        category(
            "media",
            "Media & Graphics",
            "Media players and graphics tools",
            vec![
                apt("vlc", "VLC Media Player"),
                apt("obs-studio", "OBS Studio"),
                apt("ffmpeg", "FFmpeg"),
                snap("spotify", "Spotify"),
            ],
        ),
        category(
            "devops",
            "DevOps Tools",
            "Container and DevOps tools",
            vec![
                apt("docker.io", "Docker").with_command("docker"),
                apt("docker-compose", "Docker Compose"),
            ],
        ),
        category(
            "system",
            "System Utilities",
            "System monitoring and utilities",
            vec![
                apt("btop", "btop"),
                apt("neofetch", "neofetch"),
                apt("timeshift", "Timeshift"),
            ],
        ),
        category(
            "hardware",
            "Hardware Tools",
            "Hardware management tools",
            vec![
                apt("openrgb", "OpenRGB"),
                apt("nvidia-driver-535", "NVIDIA Driver"),
                apt("nvidia-settings", "NVIDIA Settings"),
                apt("nvidia-utils", "NVIDIA Utils"),
            ],
        ),
        category(
            "automation",
            "Automation Tools",
            "Automation and testing tools",
            vec![apt("xdotool", "xdotool"), apt("ydotool", "ydotool")],
        ),
        category(
            "gnome",
            "GNOME Tools",
            "GNOME desktop environment tools",
            vec![
                apt("gnome-shell-extensions", "GNOME Shell Extensions"),
                apt("dconf-cli", "dconf CLI"),
                apt("ulauncher", "U Launcher"),
            ],
        ),
        category(
            "curl-tools",
            "Tools (via curl)",
            "Tools installed via curl scripts",
            vec![
                curl("starship", "Starship", "https://starship.rs/install.sh"),
                curl(
                    "nvm",
                    "nvm",
                    "https://raw.githubusercontent.com/nvm-sh/nvm/v0.40.1/install.sh",
                ),
                curl("rust", "Rust (via rustup)", "https://sh.rustup.rs").with_command("rustup"),
                curl("golang", "Golang (via g-install)", "https://git.io/g-install")
                    .with_command("g"),
                curl("turso", "Turso", "https://get.tur.so/install.sh"),
                PackageRecord::new("uvx", "uv", "uvx", Curl)
                    .with_extra("https://astral.sh/uv/install.sh"),
                curl("vercel", "Vercel CLI", "https://vercel.com/cli.sh"),
                curl("netlify", "Netlify CLI", "https://cli.netlify.com/install.sh"),
            ],
        ),
        category(
            "npm-tools",
            "NPM CLI Tools",
            "CLI tools installed via npm",
            vec![
                PackageRecord::new("gemini-cli", "@google/gemini-cli", "Gemini CLI", Npm)
                    .with_command("gemini"),
            ],
        ),
        category(
            "android",
            "Android Development",
            "Android Studio and emulator tools",
            vec![
                snap("android-studio", "Android Studio").with_flags("--classic"),
                script(
                    "android-emulator-setup",
                    "Android Emulator Setup",
                    "Android Emulator Configuration",
                    "scripts/setup-android-emulator.sh",
                ),
            ],
        ),
        category(
            "desktop-setup",
            "Desktop Environment Setup",
            "Desktop environment configuration and theming",
            vec![
                script(
                    "gnome-aesthetic",
                    "GNOME Aesthetic Setup",
                    "GNOME Themes & Extensions Configuration",
                    "configs/gnome/setup-aesthetic-gnome.sh",
                ),
                script(
                    "gnome-extensions",
                    "Install GNOME Extensions",
                    "Essential GNOME Extensions",
                    "configs/gnome/install-extensions.sh",
                ),
                script(
                    "gtk-styling",
                    "Apply GTK Styling",
                    "GTK Theme and Icon Configuration",
                    "configs/gnome/apply-gtk-styling.sh",
                ),
            ],
        ),
        category(
            "environment-setup",
            "Environment Configuration",
            "Environment variables and shell configuration",
            vec![script(
                "env-setup",
                "Environment Setup",
                "Private environment variables via submodules",
                "bin/setup-env",
            )],
        ),
    ]
}
