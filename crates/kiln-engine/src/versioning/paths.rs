//! Public URL arithmetic.

use kiln_graph::ResourceUrl;

/// Unversioned public path of `url`: root-relative, or under `/@fs` when outside the root.
pub fn public_path(url: &ResourceUrl, root: &ResourceUrl) -> String {
    match url.relative_to(root) {
        Some(relative) => format!("/{relative}"),
        None => format!("/@fs{}", url.path()),
    }
}

/// Insert `.{version}` before the extension of the last path segment.
pub fn versioned_path(path: &str, version: &str) -> String {
    let name_start = path.rfind('/').map_or(0, |idx| idx + 1);
    match path[name_start..].rfind('.') {
        Some(dot) if dot > 0 => {
            let dot = name_start + dot;
            format!("{}.{version}{}", &path[..dot], &path[dot..])
        }
        _ => format!("{path}.{version}"),
    }
}

/// Relative specifier reaching `to` from a resource published at `from`.
///
/// Always starts with `./` or `../` so module loaders do not treat it as bare.
pub fn relative_url(from: &str, to: &str) -> String {
    let from_dir: Vec<&str> = from
        .rsplit_once('/')
        .map_or("", |(dir, _)| dir)
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect();
    let to_segments: Vec<&str> = to.split('/').filter(|segment| !segment.is_empty()).collect();
    let Some((file, to_dir)) = to_segments.split_last() else {
        return "./".to_string();
    };

    let common = from_dir
        .iter()
        .zip(to_dir.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<&str> = Vec::new();
    parts.extend(std::iter::repeat_n("..", from_dir.len() - common));
    parts.extend(&to_dir[common..]);
    parts.push(*file);

    let joined = parts.join("/");
    if joined.starts_with("..") {
        joined
    } else {
        format!("./{joined}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_paths_are_root_relative() {
        let root = ResourceUrl::from_path("/project").unwrap();
        let inside = ResourceUrl::from_path("/project/src/app.js").unwrap();
        let outside = ResourceUrl::from_path("/shared/lib.js").unwrap();
        assert_eq!(public_path(&inside, &root), "/src/app.js");
        assert_eq!(public_path(&outside, &root), "/@fs/shared/lib.js");
    }

    #[test]
    fn version_goes_before_extension() {
        assert_eq!(versioned_path("/src/app.js", "1a2b3c4d"), "/src/app.1a2b3c4d.js");
        assert_eq!(versioned_path("/a.min.css", "ff"), "/a.min.ff.css");
        assert_eq!(versioned_path("/v1.2/LICENSE", "ff"), "/v1.2/LICENSE.ff");
        assert_eq!(versioned_path("/.env", "ff"), "/.env.ff");
    }

    #[test]
    fn relative_urls() {
        assert_eq!(relative_url("/index.html", "/app.js"), "./app.js");
        assert_eq!(relative_url("/src/main.js", "/src/lib/a.js"), "./lib/a.js");
        assert_eq!(relative_url("/src/deep/main.js", "/assets/logo.png"), "../../assets/logo.png");
        assert_eq!(relative_url("/src/a.js", "/src/b.js"), "./b.js");
    }
}
