//! PowerShell installer rendering.
//!
//! The script downloads the gzipped Windows build, verifies its SHA-512
//! checksum against the value pinned from the current snapshot, unpacks it
//! into `%APPDATA%`, and puts the binary on the user's PATH.

const INSTALL_TEMPLATE: &str = r#"# @PREFIX@ CLI PowerShell installer

$url = "@URL@"
$checksum = "@CHECKSUM@"
$destDir = "$Env:APPDATA\@PREFIX@\bin"
$exe = "$destDir\@PREFIX@.exe"

# download the gzipped exe
$gzipped = (New-Object Net.WebClient).DownloadData($url)

# verify the checksum
$sha512 = [Security.Cryptography.HashAlgorithm]::Create("SHA512")
$actualChecksum = -Join ($sha512.ComputeHash($gzipped) | ForEach { "{0:x2}" -f $_ })
If ($actualChecksum -ne $checksum) {
  Throw "Expected checksum to be $checksum but got $actualChecksum"
}

# create the destination directory
New-Item -Path $destDir -ItemType directory -Force | Out-Null

# gunzip exe into destination
$dest = New-Object System.IO.FileStream $exe,
                                        ([IO.FileMode]::Create),
                                        ([IO.FileAccess]::Write),
                                        ([IO.FileShare]::None)
$exeStream = New-Object System.IO.Compression.GzipStream (New-Object System.IO.MemoryStream(,$gzipped)),
                                                         ([IO.Compression.CompressionMode]::Decompress)
$buf = New-Object byte[](1024)
While ($true) {
  $n = $exeStream.Read($buf, 0, 1024)
  If ($n -le 0) { Break }
  $dest.Write($buf, 0, $n)
}
$dest.Close()

# ensure added to path in registry
$regPath = [Environment]::GetEnvironmentVariable("PATH", "User")
If ($regPath -notcontains $destDir) {
  [Environment]::SetEnvironmentVariable("PATH", $regPath + ";" + $destDir, "User")
}

# ensure added to path for current session
If ($Env:Path -notcontains $destDir) {
  $Env:Path += ";" + $destDir
}

Write-Host "@PREFIX@ CLI installed. Run '@PREFIX@ help' to try it out."
"#;

/// Renders the installer for one artifact URL and its expected checksum.
pub fn powershell(url: &str, checksum: &str, prefix: &str) -> String {
    INSTALL_TEMPLATE
        .replace("@URL@", url)
        .replace("@CHECKSUM@", checksum)
        .replace("@PREFIX@", prefix)
}
