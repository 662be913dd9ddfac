use remote_exec::Host;

use crate::Result;

/// `~/.steam/steam` relative to the host's home directory.
pub(crate) fn posix_base_dir(host: &dyn Host) -> Result<String> {
    let home = host.home_dir()?;
    Ok(host.join_path(&host.join_path(&home, ".steam"), "steam"))
}

#[cfg(not(windows))]
pub(crate) fn local_base_dir(host: &dyn Host) -> Result<String> {
    posix_base_dir(host)
}

/// Reads `InstallPath` from the 64-bit registry view, then the 32-bit one.
#[cfg(windows)]
pub(crate) fn local_base_dir(_host: &dyn Host) -> Result<String> {
    use winreg::enums::{HKEY_LOCAL_MACHINE, KEY_QUERY_VALUE};
    use winreg::RegKey;

    use crate::Error;

    let hklm = RegKey::predef(HKEY_LOCAL_MACHINE);
    let key = hklm
        .open_subkey_with_flags(r"SOFTWARE\Wow6432Node\Valve\Steam", KEY_QUERY_VALUE)
        .or_else(|_| hklm.open_subkey_with_flags(r"SOFTWARE\Valve\Steam", KEY_QUERY_VALUE))
        .map_err(|_| Error::SteamNotFound("cannot find steam registry key".to_string()))?;
    key.get_value::<String, _>("InstallPath")
        .map_err(|err| Error::SteamNotFound(format!("InstallPath: {err}")))
}
