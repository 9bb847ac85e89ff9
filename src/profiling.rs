//! `--profile` output: a sampled CPU profile of the whole run, the render
//! timings, and a heap profile in builds with the `dhat-heap` feature.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::constants::{
    CPU_PROFILE_FILE_NAME, CPU_PROFILE_FREQUENCY, HEAP_PROFILE_FILE_NAME, PROFILE_FILE_NAME,
};

pub struct Profiler {
    cpu: Option<pprof::ProfilerGuard<'static>>,
    #[cfg(feature = "dhat-heap")]
    heap: Option<dhat::Profiler>,
}

impl Profiler {
    /// Start sampling. A profiler that can't start is logged and skipped,
    /// ftop runs either way.
    pub fn start(dir: &Path) -> Self {
        let cpu = match pprof::ProfilerGuardBuilder::default()
            .frequency(CPU_PROFILE_FREQUENCY)
            .build()
        {
            Ok(guard) => Some(guard),
            Err(e) => {
                log::warn!("CPU profiling unavailable: {}", e);
                None
            }
        };

        #[cfg(feature = "dhat-heap")]
        let heap = Some(
            dhat::Profiler::builder()
                .file_name(dir.join(HEAP_PROFILE_FILE_NAME))
                .build(),
        );
        #[cfg(not(feature = "dhat-heap"))]
        log::warn!(
            "Not writing {}: heap profiling needs a build with --features dhat-heap",
            dir.join(HEAP_PROFILE_FILE_NAME).display()
        );

        Self {
            cpu,
            #[cfg(feature = "dhat-heap")]
            heap,
        }
    }

    /// Stop sampling and write everything into `dir`. Returns the files
    /// written.
    pub fn finish(self, dir: &Path, timings: Option<&str>) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();

        if let Some(guard) = self.cpu {
            let path = dir.join(CPU_PROFILE_FILE_NAME);
            let report = guard.report().build().context("Building CPU profile")?;
            let file = std::fs::File::create(&path)
                .with_context(|| format!("Creating {}", path.display()))?;
            report
                .flamegraph(file)
                .with_context(|| format!("Writing {}", path.display()))?;
            written.push(path);
        }

        if let Some(timings) = timings {
            let path = dir.join(PROFILE_FILE_NAME);
            std::fs::write(&path, timings)
                .with_context(|| format!("Writing {}", path.display()))?;
            written.push(path);
        }

        // dhat writes its file when the profiler is dropped
        #[cfg(feature = "dhat-heap")]
        if let Some(heap) = self.heap {
            drop(heap);
            written.push(dir.join(HEAP_PROFILE_FILE_NAME));
        }

        Ok(written)
    }
}
