fn main() {
    // Release builds stamp the git tag version through TTTH_VERSION
    if let Ok(version) = std::env::var("TTTH_VERSION") {
        println!("cargo:rustc-env=TTTH_VERSION={}", version);
    }
    println!("cargo:rerun-if-env-changed=TTTH_VERSION");

    #[cfg(target_os = "windows")]
    {
        let mut res = winresource::WindowsResource::new();
        res.set("ProductName", "ttth");
        res.set("FileDescription", "Web messengers and mail services in one window");

        let version = std::env::var("TTTH_VERSION")
            .unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string());

        let mut parts = version
            .split('.')
            .map(|s| s.parse::<u16>().unwrap_or(0))
            .chain(std::iter::repeat(0));
        let (major, minor, patch) = (
            parts.next().unwrap_or(0),
            parts.next().unwrap_or(0),
            parts.next().unwrap_or(0),
        );

        // VERSIONINFO: | major | minor | patch | build |, 16 bits each
        let version_u64 = (major as u64) << 48 | (minor as u64) << 32 | (patch as u64) << 16;
        res.set_version_info(winresource::VersionInfo::PRODUCTVERSION, version_u64);
        res.set_version_info(winresource::VersionInfo::FILEVERSION, version_u64);
        res.set("ProductVersion", &version);
        res.set("FileVersion", &version);

        res.set_manifest(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<assembly xmlns="urn:schemas-microsoft-com:asm.v1" manifestVersion="1.0">
  <assemblyIdentity version="1.0.0.0" processorArchitecture="*" name="io.github.ttth" type="win32"/>
  <description>Web messengers and mail services in one window</description>
  <trustInfo xmlns="urn:schemas-microsoft-com:asm.v3">
    <security>
      <requestedPrivileges>
        <requestedExecutionLevel level="asInvoker" uiAccess="false"/>
      </requestedPrivileges>
    </security>
  </trustInfo>
  <application xmlns="urn:schemas-microsoft-com:asm.v3">
    <windowsSettings>
      <dpiAwareness xmlns="http://schemas.microsoft.com/SMI/2016/WindowsSettings">permonitorv2,permonitor</dpiAwareness>
    </windowsSettings>
  </application>
</assembly>"#,
        );

        if let Err(e) = res.compile() {
            println!("cargo:warning=failed to compile Windows resources: {}", e);
        }
    }
}
