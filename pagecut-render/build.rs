//! Fetches a prebuilt pdfium shared library and exposes its location to the
//! crate as `PAGECUT_PDFIUM_LIBRARY_PATH`.

use std::env;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use flate2::read::GzDecoder;
use tar::Archive;
use walkdir::WalkDir;
use zip::read::ZipArchive;

const PDFIUM_BUILD: &str = "7350";
const RELEASES_URL: &str = "https://github.com/bblanchon/pdfium-binaries/releases/download";

const WATCHED_ENV: &[&str] = &[
    "PAGECUT_PDFIUM_SKIP_DOWNLOAD",
    "PAGECUT_PDFIUM_ARCHIVE",
    "PAGECUT_PDFIUM_VERSION",
    "PAGECUT_PDFIUM_PLATFORM",
    "PAGECUT_PDFIUM_BASE_URL",
    "PAGECUT_PDFIUM_REFRESH",
    "PDFIUM_DYNAMIC_LIB_PATH",
    "PDFIUM_STATIC_LIB_PATH",
];

struct Target {
    os: String,
    platform: String,
}

impl Target {
    fn from_env() -> Result<Self> {
        let os = env::var("CARGO_CFG_TARGET_OS").context("CARGO_CFG_TARGET_OS is not set")?;
        let arch =
            env::var("CARGO_CFG_TARGET_ARCH").context("CARGO_CFG_TARGET_ARCH is not set")?;
        let platform = env::var("PAGECUT_PDFIUM_PLATFORM")
            .unwrap_or_else(|_| release_platform(&os, &arch));
        Ok(Self { os, platform })
    }

    fn library_name(&self) -> &'static str {
        match self.os.as_str() {
            "windows" => "pdfium.dll",
            "macos" => "libpdfium.dylib",
            _ => "libpdfium.so",
        }
    }
}

fn main() -> Result<()> {
    println!("cargo:rerun-if-changed=build.rs");
    for var in WATCHED_ENV {
        println!("cargo:rerun-if-env-changed={var}");
    }

    if env::var_os("CARGO_FEATURE_PDF").is_none()
        || env::var_os("PAGECUT_PDFIUM_SKIP_DOWNLOAD").is_some()
        || env::var_os("PDFIUM_DYNAMIC_LIB_PATH").is_some()
        || env::var_os("PDFIUM_STATIC_LIB_PATH").is_some()
    {
        return Ok(());
    }

    let target = Target::from_env()?;
    let out_dir = PathBuf::from(env::var("OUT_DIR").context("OUT_DIR is not set")?);
    let lib_dir = out_dir.join("pdfium");
    let cache_dir = out_dir.join("pdfium-archives");
    fs::create_dir_all(&lib_dir).context("failed to create pdfium directory")?;

    if let Some(found) = find_library(&lib_dir, target.library_name()) {
        return export_library_path(&found);
    }

    let archive = match env::var_os("PAGECUT_PDFIUM_ARCHIVE") {
        Some(path) => PathBuf::from(path),
        None => fetch_archive(&cache_dir, &target.platform)?,
    };
    unpack(&archive, &lib_dir)?;

    let found = find_library(&lib_dir, target.library_name()).ok_or_else(|| {
        anyhow!(
            "{} missing from {} after unpacking {}",
            target.library_name(),
            lib_dir.display(),
            archive.display()
        )
    })?;
    export_library_path(&found)
}

fn export_library_path(path: &Path) -> Result<()> {
    let path = path
        .to_str()
        .ok_or_else(|| anyhow!("library path {} is not UTF-8", path.display()))?;
    println!("cargo:rustc-env=PAGECUT_PDFIUM_LIBRARY_PATH={path}");
    Ok(())
}

fn release_platform(os: &str, arch: &str) -> String {
    let os = match os {
        "macos" => "mac",
        other => other,
    };
    let arch = match arch {
        "x86_64" => "x64",
        "aarch64" => "arm64",
        other => other,
    };
    format!("{os}-{arch}")
}

fn find_library(root: &Path, name: &str) -> Option<PathBuf> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .find(|entry| entry.file_type().is_file() && entry.file_name() == name)
        .map(|entry| entry.into_path())
}

fn fetch_archive(cache_dir: &Path, platform: &str) -> Result<PathBuf> {
    let version = env::var("PAGECUT_PDFIUM_VERSION").unwrap_or_else(|_| PDFIUM_BUILD.into());
    let base_url = env::var("PAGECUT_PDFIUM_BASE_URL").unwrap_or_else(|_| RELEASES_URL.into());
    let refresh = env::var_os("PAGECUT_PDFIUM_REFRESH").is_some();
    fs::create_dir_all(cache_dir).context("failed to create archive cache")?;

    let names = [
        format!("pdfium-{platform}.tgz"),
        format!("pdfium-{version}-{platform}.tgz"),
        format!("pdfium-{platform}.zip"),
    ];
    let mut failures = Vec::new();
    for name in &names {
        let dest = cache_dir.join(name);
        if dest.is_file() && !refresh {
            return Ok(dest);
        }
        let url = format!(
            "{}/chromium/{}/{}",
            base_url.trim_end_matches('/'),
            version,
            name
        );
        match download(&url, &dest) {
            Ok(()) => return Ok(dest),
            Err(err) => failures.push(err.to_string()),
        }
    }

    bail!(
        "could not download pdfium {version} for {platform}: {}",
        failures.join("; ")
    )
}

fn download(url: &str, dest: &Path) -> Result<()> {
    let agent = ureq::AgentBuilder::new()
        .timeout_read(Duration::from_secs(120))
        .build();
    let response = agent.get(url).call().map_err(|err| match err {
        ureq::Error::Status(code, _) => anyhow!("GET {url} returned HTTP {code}"),
        other => anyhow!("GET {url} failed: {other}"),
    })?;

    let mut file = File::create(dest).with_context(|| format!("failed to create {}", dest.display()))?;
    if let Err(err) = io::copy(&mut response.into_reader(), &mut file) {
        let _ = fs::remove_file(dest);
        return Err(err).with_context(|| format!("failed to write {}", dest.display()));
    }
    Ok(())
}

fn unpack(archive: &Path, dest: &Path) -> Result<()> {
    if dest.exists() {
        fs::remove_dir_all(dest).with_context(|| format!("failed to clear {}", dest.display()))?;
    }
    fs::create_dir_all(dest)?;

    let file = File::open(archive).with_context(|| format!("failed to open {}", archive.display()))?;
    let extension = archive
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("tgz") | Some("gz") => Archive::new(GzDecoder::new(file))
            .unpack(dest)
            .with_context(|| format!("failed to unpack {}", archive.display())),
        Some("zip") => ZipArchive::new(file)
            .and_then(|mut zip| zip.extract(dest))
            .with_context(|| format!("failed to extract {}", archive.display())),
        _ => bail!("unsupported archive {}", archive.display()),
    }
}
