// Newline-delimited push protocol: `keyword: arg1[: arg2]`, fields trimmed.

/// Kind of artifact a push notification refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// Zip archive of photos; unpacked after download.
    PhotoZip,
    /// Plain file of marker-corner detections.
    Aruco,
    /// Plain file of marker world coordinates.
    Marker,
    /// Plain file of per-image capture metadata.
    Meta,
}

impl ArtifactKind {
    /// Whether the downloaded file is an archive to unpack.
    pub fn is_archive(self) -> bool {
        matches!(self, ArtifactKind::PhotoZip)
    }
}

/// One parsed line from the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceMessage {
    /// Liveness only; ignored.
    Heartbeat,
    /// An artifact is available for download.
    Artifact {
        kind: ArtifactKind,
        session_id: String,
        url: String,
    },
    /// Unrecognized keyword; logged and skipped, never terminates the loop.
    Unknown(String),
}

/// Parse one protocol line. Splits on `:` into at most three fields and trims
/// each. Lines with a known keyword but missing arguments come back as
/// `Unknown` so the receive loop logs and survives them.
pub fn parse_line(line: &str) -> DeviceMessage {
    let mut parts = line.splitn(3, ':').map(str::trim);
    let keyword = parts.next().unwrap_or("");
    let arg1 = parts.next();
    let arg2 = parts.next();

    let kind = match keyword {
        "heartbeat" => return DeviceMessage::Heartbeat,
        "photoZip" => ArtifactKind::PhotoZip,
        "aruco" => ArtifactKind::Aruco,
        "marker" => ArtifactKind::Marker,
        "meta" => ArtifactKind::Meta,
        _ => return DeviceMessage::Unknown(line.to_string()),
    };

    match (arg1, arg2) {
        (Some(session_id), Some(url)) if !session_id.is_empty() && !url.is_empty() => {
            DeviceMessage::Artifact {
                kind,
                session_id: session_id.to_string(),
                url: url.to_string(),
            }
        }
        _ => DeviceMessage::Unknown(line.to_string()),
    }
}

/// Filename part of a device-advertised URL (everything after the last `/`).
pub fn filename_from_url(url: &str) -> &str {
    url.rsplit('/').next().unwrap_or(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_every_known_keyword() {
        assert_eq!(parse_line("heartbeat"), DeviceMessage::Heartbeat);

        let cases = [
            ("photoZip: s1: host/a.zip", ArtifactKind::PhotoZip, "a.zip"),
            ("aruco: s1: host/aruco.json", ArtifactKind::Aruco, "aruco.json"),
            ("marker: s1: host/marker.json", ArtifactKind::Marker, "marker.json"),
            ("meta: s1: host/meta.json", ArtifactKind::Meta, "meta.json"),
        ];
        for (line, kind, filename) in cases {
            match parse_line(line) {
                DeviceMessage::Artifact {
                    kind: k,
                    session_id,
                    url,
                } => {
                    assert_eq!(k, kind);
                    assert_eq!(session_id, "s1");
                    assert_eq!(filename_from_url(&url), filename);
                }
                other => panic!("{line:?} parsed as {other:?}"),
            }
        }
    }

    #[test]
    fn fields_are_trimmed() {
        let msg = parse_line("  meta :  abc  :  10.0.0.5/meta.json ");
        assert_eq!(
            msg,
            DeviceMessage::Artifact {
                kind: ArtifactKind::Meta,
                session_id: "abc".to_string(),
                url: "10.0.0.5/meta.json".to_string(),
            }
        );
    }

    #[test]
    fn unknown_and_malformed_lines_do_not_panic() {
        assert!(matches!(parse_line("bogus: x: y"), DeviceMessage::Unknown(_)));
        assert!(matches!(parse_line(""), DeviceMessage::Unknown(_)));
        assert!(matches!(parse_line("photoZip"), DeviceMessage::Unknown(_)));
        assert!(matches!(parse_line("photoZip: s1"), DeviceMessage::Unknown(_)));
    }
}
