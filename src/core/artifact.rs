use crate::core::decode::Post;
use crate::error::Result;
use std::fs as std_fs;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Write each post to `dir/{platform}_post.txt`, creating `dir` if needed.
pub async fn save_posts(dir: &Path, posts: &[Post]) -> Result<Vec<PathBuf>> {
    ensure_directory(dir)?;

    let mut written = Vec::with_capacity(posts.len());
    for post in posts {
        let path = dir.join(post.file_name());
        fs::write(&path, &post.content).await?;
        tracing::info!(path = %path.display(), "post saved");
        written.push(path);
    }

    Ok(written)
}

fn ensure_directory(path: &Path) -> Result<()> {
    std_fs::create_dir_all(path)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let metadata = std_fs::metadata(path)?;
        let mut permissions = metadata.permissions();
        if permissions.mode() & 0o777 != 0o700 {
            permissions.set_mode(0o700);
            std_fs::set_permissions(path, permissions)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_one_file_per_post() {
        let tmp = tempfile::tempdir().unwrap();
        let out = tmp.path().join("posts");
        let posts = vec![Post::new("LinkedIn", "Hello network"), Post::new("Twitter", "hi")];

        let paths = save_posts(&out, &posts).await.unwrap();

        assert_eq!(paths, vec![out.join("linkedin_post.txt"), out.join("twitter_post.txt")]);
        assert_eq!(std_fs::read_to_string(&paths[0]).unwrap(), "Hello network");
        assert_eq!(std_fs::read_to_string(&paths[1]).unwrap(), "hi");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn output_directory_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let out = tmp.path().join("private");
        save_posts(&out, &[]).await.unwrap();

        let mode = std_fs::metadata(&out).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o700);
    }
}
