use std::path::{Path, PathBuf};

use rand::Rng;

/// One isolated evaluation: a unique name and a private working directory
/// holding `<id>.inp` and whatever the solver writes next to it.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: String,
    pub dir: PathBuf,
    pub input: PathBuf,
}

/// `job_<unix millis>_<4 hex>`; unique across concurrent workers.
pub fn generate_job_id() -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let suffix: u16 = rand::rng().random();
    format!("job_{}_{:04x}", millis, suffix)
}

impl Job {
    /// Create a fresh directory under `root` and write the rendered input.
    ///
    /// Directory names never collide: an existing name is retried with a new id.
    pub fn create(root: &Path, input_text: &str) -> std::io::Result<Self> {
        std::fs::create_dir_all(root)?;
        let (id, dir) = loop {
            let id = generate_job_id();
            let dir = root.join(&id);
            match std::fs::create_dir(&dir) {
                Ok(()) => break (id, dir),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e),
            }
        };
        let input = dir.join(format!("{}.inp", id));
        std::fs::write(&input, input_text)?;
        Ok(Self { id, dir, input })
    }

    pub fn file(&self, extension: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", self.id, extension))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_job_id_format() {
        let id = generate_job_id();
        let parts: Vec<&str> = id.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "job");
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), 4);
        assert!(u16::from_str_radix(parts[2], 16).is_ok());
    }

    #[test]
    fn test_jobs_are_isolated() {
        let root = tempfile::tempdir().unwrap();
        let jobs: Vec<Job> = (0..50).map(|i| Job::create(root.path(), &format!("deck {}", i)).unwrap()).collect();
        let dirs: HashSet<&PathBuf> = jobs.iter().map(|j| &j.dir).collect();
        assert_eq!(dirs.len(), 50);
        for (i, job) in jobs.iter().enumerate() {
            assert_eq!(std::fs::read_to_string(&job.input).unwrap(), format!("deck {}", i));
            assert_eq!(job.file("odb"), job.dir.join(format!("{}.odb", job.id)));
        }
    }
}
