//! The model interface: the top-level orchestrator that ties the TPL
//! writer, the process runner, and the INS reader together into one
//! evaluation.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crate::error::{ConfigError, FileHygieneError, ModelError};
use crate::ins::InstructionFile;
use crate::names::{canonicalize, ObservationSink, ParameterSource};
use crate::runner;
use crate::tpl::TemplateFile;

const HYGIENE_RETRIES: usize = 5;
const HYGIENE_BACKOFF: Duration = Duration::from_secs(1);

/// A fully validated pairing of TPL/INS files with the input/output paths
/// they read and write, and the commands that connect them. Built once by
/// [`ModelInterface::initialize`] and reused across evaluations via
/// [`ModelInterface::run`].
pub struct ModelInterface {
    templates: Vec<TemplateFile>,
    inp_paths: Vec<PathBuf>,
    instructions: Vec<InstructionFile>,
    out_paths: Vec<PathBuf>,
    commands: Vec<String>,
    par_names: Vec<String>,
    obs_names: Vec<String>,
}

impl ModelInterface {
    /// Validate configuration, parse every TPL and INS file once, and
    /// cross-check that every name they reference is one the caller
    /// declared.
    pub fn initialize(
        tpl_paths: &[PathBuf],
        inp_paths: &[PathBuf],
        ins_paths: &[PathBuf],
        out_paths: &[PathBuf],
        commands: Vec<String>,
        par_names: Vec<String>,
        obs_names: Vec<String>,
    ) -> Result<Self, ModelError> {
        if commands.is_empty() {
            return Err(ConfigError::EmptyCommandList.into());
        }
        if tpl_paths.is_empty() {
            return Err(ConfigError::EmptyFileList { which: "template" }.into());
        }
        if ins_paths.is_empty() {
            return Err(ConfigError::EmptyFileList { which: "instruction" }.into());
        }
        if tpl_paths.len() != inp_paths.len() {
            return Err(ConfigError::CountMismatch {
                tpl_count: tpl_paths.len(),
                inp_count: inp_paths.len(),
            }
            .into());
        }
        if ins_paths.len() != out_paths.len() {
            return Err(ConfigError::InsCountMismatch {
                ins_count: ins_paths.len(),
                out_count: out_paths.len(),
            }
            .into());
        }

        let par_names: Vec<String> = par_names.iter().map(|n| canonicalize(n)).collect();
        let obs_names: Vec<String> = obs_names.iter().map(|n| canonicalize(n)).collect();

        let mut templates = Vec::with_capacity(tpl_paths.len());
        for path in tpl_paths {
            let tpl = TemplateFile::open(path)?;
            for name in tpl.parse_and_check()? {
                if !par_names.contains(&name) {
                    return Err(ConfigError::UnknownParameterName(name).into());
                }
            }
            templates.push(tpl);
        }

        let mut instructions = Vec::with_capacity(ins_paths.len());
        for path in ins_paths {
            let ins = InstructionFile::open(path)?;
            for name in ins.parse_and_check()? {
                if !obs_names.contains(&name) {
                    return Err(ConfigError::UnknownObservationName(name).into());
                }
            }
            instructions.push(ins);
        }

        Ok(Self {
            templates,
            inp_paths: inp_paths.to_vec(),
            instructions,
            out_paths: out_paths.to_vec(),
            commands,
            par_names,
            obs_names,
        })
    }

    /// Run one evaluation: delete stale files, write inputs, run commands,
    /// read outputs, update the caller's containers. Every exit path sets
    /// `done`; failures are captured into `error_sink` rather than
    /// propagated, so a worker thread driving this never panics on a model
    /// failure.
    pub fn run(
        &self,
        params: &mut impl ParameterSource,
        observations: &mut impl ObservationSink,
        cancel: Arc<AtomicBool>,
        done: Arc<AtomicBool>,
        error_sink: Arc<Mutex<Option<ModelError>>>,
    ) {
        let result = self.try_run(params, observations, &cancel);
        if let Err(e) = result {
            log::error!("evaluation failed: {e}");
            *error_sink.lock().expect("error sink mutex poisoned") = Some(e);
        }
        done.store(true, Ordering::SeqCst);
    }

    fn try_run(
        &self,
        params: &mut impl ParameterSource,
        observations: &mut impl ObservationSink,
        cancel: &Arc<AtomicBool>,
    ) -> Result<(), ModelError> {
        clean_stale_files(self.inp_paths.iter().chain(self.out_paths.iter()))?;

        // Fail fast if the caller's parameter container can't resolve every
        // declared name, before any input file is written.
        let par_vals = params.get_data_vec(&self.par_names).map_err(|_| {
            ModelError::InternalInvariant(
                "parameter container missing a declared name at run time".to_string(),
            )
        })?;

        for (tpl, inp_path) in self.templates.iter().zip(&self.inp_paths) {
            tpl.write_input_file(inp_path, params)?;
        }

        let cancelled = runner::run_commands(&self.commands, cancel)?;
        if cancelled {
            log::info!("evaluation cancelled before outputs were read");
            return Ok(());
        }

        let mut bound: HashMap<String, f64> = HashMap::new();
        for (ins, out_path) in self.instructions.iter().zip(&self.out_paths) {
            ins.bind_into(out_path, &mut bound)?;
        }

        let mut values = Vec::with_capacity(self.obs_names.len());
        for name in &self.obs_names {
            match bound.get(name) {
                Some(v) => values.push(*v),
                None => {
                    return Err(crate::ins::InsError::MissingObs {
                        path: self.instructions[0].path().to_path_buf(),
                        name: name.clone(),
                    }
                    .into())
                }
            }
        }
        params.update(&self.par_names, &par_vals);
        observations.update(&self.obs_names, &values);
        Ok(())
    }
}

fn clean_stale_files<'a>(paths: impl Iterator<Item = &'a PathBuf>) -> Result<(), ModelError> {
    let paths: Vec<&Path> = paths.map(PathBuf::as_path).collect();
    let mut remaining: Vec<&Path> = paths.iter().filter(|p| p.exists()).copied().collect();

    for attempt in 1..=HYGIENE_RETRIES {
        remaining.retain(|p| {
            if !p.exists() {
                return false;
            }
            std::fs::remove_file(p).is_err()
        });
        if remaining.is_empty() {
            return Ok(());
        }
        if attempt < HYGIENE_RETRIES {
            log::warn!(
                "retrying deletion of {} stale file(s), attempt {attempt}/{HYGIENE_RETRIES}",
                remaining.len()
            );
            thread::sleep(HYGIENE_BACKOFF);
        }
    }

    Err(FileHygieneError {
        paths: remaining.into_iter().map(Path::to_path_buf).collect(),
        attempts: HYGIENE_RETRIES,
    }
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::names::ValueMap;
    use std::io::Write;

    fn write_file(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn initialize_rejects_count_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let tpl = write_file(&dir, "a.tpl", "PTF ~\nx= ~A~\n");
        let ins = write_file(&dir, "a.ins", "PIF ~\n!B!\n");
        let err = ModelInterface::initialize(
            &[tpl, dir.path().join("b.tpl")],
            &[dir.path().join("a.inp")],
            &[ins],
            &[dir.path().join("a.out")],
            vec!["true".to_string()],
            vec!["A".to_string()],
            vec!["B".to_string()],
        )
        .unwrap_err();
        assert!(matches!(err, ModelError::Config(ConfigError::CountMismatch { .. })));
    }

    #[test]
    fn initialize_rejects_unknown_parameter_name() {
        let dir = tempfile::tempdir().unwrap();
        let tpl = write_file(&dir, "a.tpl", "PTF ~\nx= ~UNDECLARED~\n");
        let ins = write_file(&dir, "a.ins", "PIF ~\n!B!\n");
        let err = ModelInterface::initialize(
            &[tpl],
            &[dir.path().join("a.inp")],
            &[ins],
            &[dir.path().join("a.out")],
            vec!["true".to_string()],
            vec!["A".to_string()],
            vec!["B".to_string()],
        )
        .unwrap_err();
        assert!(matches!(err, ModelError::Config(ConfigError::UnknownParameterName(_))));
    }

    #[test]
    #[cfg(unix)]
    fn full_evaluation_writes_input_and_reads_observation() {
        let dir = tempfile::tempdir().unwrap();
        let tpl_path = write_file(&dir, "a.tpl", "PTF ~\nx= ~A       ~\n");
        let ins_path = write_file(&dir, "a.ins", "PIF ~\nDUM !B!\n");
        let inp_path = dir.path().join("a.inp");
        let out_path = dir.path().join("a.out");

        let model = ModelInterface::initialize(
            &[tpl_path],
            &[inp_path.clone()],
            &[ins_path],
            &[out_path.clone()],
            vec![format!("cp {} {}", inp_path.display(), out_path.display())],
            vec!["A".to_string()],
            vec!["B".to_string()],
        )
        .unwrap();

        let mut params = ValueMap::new();
        params.set("A", 2.0);
        let mut obs = ValueMap::new();
        obs.set("B", 0.0);

        let cancel = Arc::new(AtomicBool::new(false));
        let done = Arc::new(AtomicBool::new(false));
        let error_sink = Arc::new(Mutex::new(None));

        model.run(&mut params, &mut obs, cancel, done.clone(), error_sink.clone());

        assert!(done.load(Ordering::SeqCst));
        assert!(error_sink.lock().unwrap().is_none(), "{:?}", error_sink.lock().unwrap());
        let written = std::fs::read_to_string(&inp_path).unwrap();
        assert_eq!(written, "x= 2.00000000\n");
        assert_eq!(obs.get("B"), Some(2.0));
    }
}
