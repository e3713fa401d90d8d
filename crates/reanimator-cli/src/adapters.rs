//! External-process collaborators.
//!
//! Each collaborator is an executable that reads one JSON request on stdin and
//! writes one JSON response on stdout. Responses may carry a `warnings` array,
//! which is moved into the job's warning buffer. A non-zero exit status is a
//! collaborator fault; stderr is kept for the error message.

use crate::config::{CollaboratorCommands, CommandSpec};
use reanimator::core::io::pdb::PdbStructure;
use reanimator::core::models::atom::Atom;
use reanimator::core::models::locator::ResidueLocator;
use reanimator::core::models::molecule::Molecule;
use reanimator::engine::collaborators::{
    Collaborators, Deviation, DeviationCalculator, FragmentPlacer, Minimizer, MinimizerInput,
    MinimizerSession, Parameterization, ParameterizationRequest, Parameterizer, ParamsTest,
    PlacementRequest, PlacementResult, SubstructureMatcher,
};
use reanimator::engine::error::CollaboratorError;
use reanimator::engine::warnings::WarningBuffer;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use tracing::{debug, trace};

#[derive(Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    warnings: Vec<String>,
    #[serde(flatten)]
    body: T,
}

/// One configured executable.
#[derive(Debug, Clone)]
pub struct ProcessCollaborator {
    role: &'static str,
    command: CommandSpec,
}

impl ProcessCollaborator {
    pub fn new(role: &'static str, command: CommandSpec) -> Self {
        Self { role, command }
    }

    fn invoke<Req, Resp>(
        &self,
        request: &Req,
        warnings: &mut WarningBuffer,
    ) -> Result<Resp, CollaboratorError>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        let program = self.command.program.display().to_string();
        let payload = serde_json::to_vec(request)
            .map_err(|e| CollaboratorError::with_source("failed to encode the request", e))?;
        debug!(role = self.role, program = %program, "Invoking external collaborator.");

        let mut child = Command::new(&self.command.program)
            .args(&self.command.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| CollaboratorError::with_source(format!("failed to start {}", program), e))?;

        // Written from a separate thread so a chatty child cannot block on a full stdout pipe.
        let writer = child.stdin.take().map(|mut stdin| {
            thread::spawn(move || stdin.write_all(&payload))
        });
        let output = child
            .wait_with_output()
            .map_err(|e| CollaboratorError::with_source(format!("failed to wait for {}", program), e))?;
        if let Some(writer) = writer {
            match writer.join() {
                Ok(Ok(())) => {}
                Ok(Err(e)) if output.status.success() => {
                    return Err(CollaboratorError::with_source(
                        format!("failed to send the request to {}", program),
                        e,
                    ));
                }
                Ok(Err(_)) => {}
                Err(_) => {
                    return Err(CollaboratorError::new(format!(
                        "request writer for {} panicked",
                        program
                    )));
                }
            }
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CollaboratorError::new(format!(
                "{} exited with {}: {}",
                program,
                output.status,
                stderr.trim()
            )));
        }
        trace!(role = self.role, bytes = output.stdout.len(), "Collaborator responded.");

        let envelope: Envelope<Resp> = serde_json::from_slice(&output.stdout).map_err(|e| {
            CollaboratorError::with_source(format!("{} returned an unreadable response", program), e)
        })?;
        warnings.extend(envelope.warnings);
        Ok(envelope.body)
    }
}

#[derive(Serialize)]
struct ParameterizeMessage<'a> {
    smiles: &'a str,
    name: &'a str,
    residue_name: &'a str,
}

#[derive(Deserialize)]
struct ParameterizeReply {
    name: String,
    content: String,
    template: Molecule,
    #[serde(default)]
    attachments: Vec<usize>,
}

impl Parameterizer for ProcessCollaborator {
    fn parameterize(
        &self,
        request: &ParameterizationRequest<'_>,
        warnings: &mut WarningBuffer,
    ) -> Result<Parameterization, CollaboratorError> {
        let reply: ParameterizeReply = self.invoke(
            &ParameterizeMessage {
                smiles: request.smiles,
                name: request.name,
                residue_name: request.residue_name,
            },
            warnings,
        )?;
        if let Some(&index) = reply.attachments.iter().find(|&&i| i >= reply.template.len()) {
            return Err(CollaboratorError::new(format!(
                "attachment index {} is outside the {}-atom template",
                index,
                reply.template.len()
            )));
        }
        Ok(Parameterization {
            name: reply.name,
            content: reply.content,
            template: reply.template,
            attachments: reply.attachments,
        })
    }
}

#[derive(Serialize)]
struct MatchMessage<'a> {
    molecule: &'a Molecule,
    pattern: &'a str,
}

#[derive(Deserialize)]
struct MatchReply {
    #[serde(rename = "match")]
    matched: Option<Vec<usize>>,
}

impl SubstructureMatcher for ProcessCollaborator {
    fn find_match(
        &self,
        molecule: &Molecule,
        pattern: &str,
        warnings: &mut WarningBuffer,
    ) -> Result<Option<Vec<usize>>, CollaboratorError> {
        let reply: MatchReply = self.invoke(&MatchMessage { molecule, pattern }, warnings)?;
        Ok(reply.matched)
    }
}

#[derive(Serialize)]
struct PlaceMessage<'a> {
    template: &'a Molecule,
    hits: &'a [Molecule],
    attachment: Option<&'a Atom>,
}

#[derive(Deserialize)]
struct PlaceReply {
    scaffold: Molecule,
    chimera: Molecule,
    positioned: Molecule,
    origins: Vec<Vec<String>>,
    stdev: Vec<f64>,
}

impl FragmentPlacer for ProcessCollaborator {
    fn place(
        &self,
        request: &PlacementRequest<'_>,
        warnings: &mut WarningBuffer,
    ) -> Result<PlacementResult, CollaboratorError> {
        let reply: PlaceReply = self.invoke(
            &PlaceMessage {
                template: request.template,
                hits: request.hits,
                attachment: request.attachment,
            },
            warnings,
        )?;
        PlacementResult::new(
            reply.scaffold,
            reply.chimera,
            reply.positioned,
            reply.origins,
            reply.stdev,
        )
    }
}

#[derive(Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum MinimizerMessage<'a> {
    Minimise {
        pdb: &'a str,
        params_file: &'a Path,
        constraint_file: String,
        ligand: ResidueLocator,
        key_residues: &'a [String],
    },
    TestParams {
        params_file: &'a Path,
        residue_name: &'a str,
    },
}

#[derive(Deserialize)]
struct MinimiseReply {
    pdb: String,
    score: f64,
}

#[derive(Deserialize)]
struct TestParamsReply {
    pdb: String,
    score: f64,
}

impl Minimizer for ProcessCollaborator {
    fn prepare(
        &self,
        input: &MinimizerInput<'_>,
        _warnings: &mut WarningBuffer,
    ) -> Result<Box<dyn MinimizerSession>, CollaboratorError> {
        Ok(Box::new(ProcessSession {
            collaborator: self.clone(),
            pdb: input.pdb.to_string(),
            params_file: input.params_file.to_path_buf(),
            constraint_file: input.constraint_file_arg(),
            ligand: input.ligand,
            key_residues: input.key_residues.iter().map(ToString::to_string).collect(),
            score: None,
        }))
    }

    fn test_params(
        &self,
        params_file: &Path,
        residue_name: &str,
        warnings: &mut WarningBuffer,
    ) -> Result<ParamsTest, CollaboratorError> {
        let reply: TestParamsReply = self.invoke(
            &MinimizerMessage::TestParams {
                params_file,
                residue_name,
            },
            warnings,
        )?;
        Ok(ParamsTest {
            pdb: reply.pdb,
            score: reply.score,
        })
    }
}

/// A pose kept in memory between calls to the minimizer executable.
///
/// Pose hooks may rewrite `pdb` before minimisation by downcasting the session.
pub struct ProcessSession {
    collaborator: ProcessCollaborator,
    pub pdb: String,
    params_file: PathBuf,
    constraint_file: String,
    ligand: ResidueLocator,
    key_residues: Vec<String>,
    score: Option<f64>,
}

impl MinimizerSession for ProcessSession {
    fn pose_pdb(&self) -> Result<String, CollaboratorError> {
        Ok(self.pdb.clone())
    }

    fn minimise(&mut self, warnings: &mut WarningBuffer) -> Result<(), CollaboratorError> {
        let reply: MinimiseReply = self.collaborator.invoke(
            &MinimizerMessage::Minimise {
                pdb: &self.pdb,
                params_file: &self.params_file,
                constraint_file: self.constraint_file.clone(),
                ligand: self.ligand,
                key_residues: &self.key_residues,
            },
            warnings,
        )?;
        self.pdb = reply.pdb;
        self.score = Some(reply.score);
        Ok(())
    }

    fn ligand_score(&self) -> Result<f64, CollaboratorError> {
        self.score
            .ok_or_else(|| CollaboratorError::new("the pose has not been minimised"))
    }

    fn ligand_from_pose(&self) -> Result<Molecule, CollaboratorError> {
        let mut pose = PdbStructure::parse(&self.pdb)
            .map_err(|e| CollaboratorError::with_source("the minimised pose is not valid PDB", e))?;
        pose.retain(|record| record.is_at(&self.ligand));
        if pose.records.is_empty() {
            return Err(CollaboratorError::new(format!(
                "the minimised pose has no ligand residue at {}",
                self.ligand
            )));
        }
        Ok(pose.to_molecule())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[derive(Serialize)]
struct DeviationMessage<'a> {
    ligand: &'a Molecule,
    hits: &'a [Molecule],
    positioned: &'a Molecule,
}

#[derive(Deserialize)]
struct DeviationReply {
    #[serde(rename = "mRMSD")]
    mrmsd: f64,
    #[serde(rename = "RMSDs")]
    rmsds: Vec<f64>,
}

impl DeviationCalculator for ProcessCollaborator {
    fn deviation(
        &self,
        ligand: &Molecule,
        hits: &[Molecule],
        positioned: &Molecule,
        warnings: &mut WarningBuffer,
    ) -> Result<Deviation, CollaboratorError> {
        let reply: DeviationReply = self.invoke(
            &DeviationMessage {
                ligand,
                hits,
                positioned,
            },
            warnings,
        )?;
        Ok(Deviation {
            mrmsd: reply.mrmsd,
            rmsds: reply.rmsds,
        })
    }
}

/// The five collaborators of a job, one executable each.
pub struct ProcessCollaborators {
    parameterizer: ProcessCollaborator,
    matcher: ProcessCollaborator,
    placer: ProcessCollaborator,
    minimizer: ProcessCollaborator,
    deviation: ProcessCollaborator,
}

impl ProcessCollaborators {
    pub fn new(commands: &CollaboratorCommands) -> Self {
        Self {
            parameterizer: ProcessCollaborator::new("parameterizer", commands.parameterizer.clone()),
            matcher: ProcessCollaborator::new("matcher", commands.matcher.clone()),
            placer: ProcessCollaborator::new("placer", commands.placer.clone()),
            minimizer: ProcessCollaborator::new("minimizer", commands.minimizer.clone()),
            deviation: ProcessCollaborator::new("deviation", commands.deviation.clone()),
        }
    }

    pub fn as_collaborators(&self) -> Collaborators<'_> {
        Collaborators {
            parameterizer: &self.parameterizer,
            matcher: &self.matcher,
            placer: &self.placer,
            minimizer: &self.minimizer,
            deviation: &self.deviation,
        }
    }
}

#[cfg(test)]
#[cfg(unix)]
mod tests {
    use super::*;
    use nalgebra::Point3;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    /// Writes an executable shell script that ignores its input and prints `reply`.
    fn script(dir: &TempDir, name: &str, body: &str) -> CommandSpec {
        let path = dir.path().join(name);
        fs::write(&path, format!("#!/bin/sh\ncat > /dev/null\n{}\n", body)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        CommandSpec {
            program: path,
            args: vec![],
        }
    }

    fn reply(dir: &TempDir, name: &str, json: &str) -> ProcessCollaborator {
        ProcessCollaborator::new("test", script(dir, name, &format!("printf '%s' '{}'", json)))
    }

    #[test]
    fn warnings_are_moved_into_the_buffer() {
        let dir = tempfile::tempdir().unwrap();
        let matcher = reply(&dir, "matcher.sh", r#"{"match": [2, 0, 1], "warnings": ["stereo ignored"]}"#);
        let mut warnings = WarningBuffer::new();
        let found = matcher
            .find_match(&Molecule::new(), "C(=O)C*", &mut warnings)
            .unwrap();
        assert_eq!(found, Some(vec![2, 0, 1]));
        assert_eq!(warnings.pending(), ["stereo ignored"]);
    }

    #[test]
    fn null_match_means_no_match() {
        let dir = tempfile::tempdir().unwrap();
        let matcher = reply(&dir, "matcher.sh", r#"{"match": null}"#);
        let found = matcher
            .find_match(&Molecule::new(), "C(#N)*", &mut WarningBuffer::new())
            .unwrap();
        assert_eq!(found, None);
    }

    #[test]
    fn non_zero_exit_is_a_fault_with_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let failing = ProcessCollaborator::new(
            "test",
            script(&dir, "fail.sh", "echo 'no licence' >&2\nexit 3"),
        );
        let err = failing
            .find_match(&Molecule::new(), "*", &mut WarningBuffer::new())
            .unwrap_err();
        assert!(err.message().contains("no licence"));
    }

    #[test]
    fn unreadable_response_is_a_fault() {
        let dir = tempfile::tempdir().unwrap();
        let garbage = reply(&dir, "garbage.sh", "not json");
        assert!(
            garbage
                .find_match(&Molecule::new(), "*", &mut WarningBuffer::new())
                .is_err()
        );
    }

    #[test]
    fn missing_program_is_a_fault() {
        let missing = ProcessCollaborator::new(
            "test",
            CommandSpec {
                program: PathBuf::from("/nonexistent/reanimator-collaborator"),
                args: vec![],
            },
        );
        let err = missing
            .find_match(&Molecule::new(), "*", &mut WarningBuffer::new())
            .unwrap_err();
        assert!(err.message().contains("failed to start"));
    }

    #[test]
    fn parameterizer_rejects_out_of_range_attachments() {
        let dir = tempfile::tempdir().unwrap();
        let mut template = Molecule::new();
        template.add_atom(Atom::new("C1", "C", Point3::origin()));
        let json = serde_json::json!({
            "name": "LIG",
            "content": "NAME LIG\n",
            "template": template,
            "attachments": [4],
        });
        let parameterizer = reply(&dir, "params.sh", &json.to_string());
        let request = ParameterizationRequest {
            smiles: "C*",
            name: "ligand",
            residue_name: "LIG",
        };
        let err = parameterizer
            .parameterize(&request, &mut WarningBuffer::new())
            .unwrap_err();
        assert!(err.message().contains("outside"));
    }

    #[test]
    fn template_with_a_dangling_bond_is_a_fault() {
        let dir = tempfile::tempdir().unwrap();
        let mut template = Molecule::new();
        template.add_atom(Atom::new("C1", "C", Point3::origin()));
        let mut template = serde_json::to_value(&template).unwrap();
        template["bonds"] = serde_json::json!([{"atom1": 0, "atom2": 7, "order": "single"}]);
        let json = serde_json::json!({
            "name": "LIG",
            "content": "NAME LIG\n",
            "template": template,
        });
        let parameterizer = reply(&dir, "params.sh", &json.to_string());
        let request = ParameterizationRequest {
            smiles: "CC",
            name: "ligand",
            residue_name: "LIG",
        };
        let err = parameterizer
            .parameterize(&request, &mut WarningBuffer::new())
            .unwrap_err();
        assert!(err.message().contains("unreadable response"));
    }

    #[test]
    fn session_extracts_the_ligand_residue_after_minimisation() {
        let dir = tempfile::tempdir().unwrap();
        let pose = "ATOM      1  CA  CYS A 145      11.000  11.500  12.500  1.00  0.00           C\\n\
HETATM    2  CX  LIG B   1      12.000  12.000  13.000  1.00  0.00           C\\n\
END\\n";
        let minimizer = reply(
            &dir,
            "minimizer.sh",
            &format!(r#"{{"pdb": "{}", "score": -8.5}}"#, pose),
        );
        let params = dir.path().join("ligand.params");
        let input = MinimizerInput {
            pdb: "END\n",
            params_file: &params,
            constraint_file: None,
            ligand: "1B".parse().unwrap(),
            key_residues: vec![],
        };
        let mut warnings = WarningBuffer::new();
        let mut session = minimizer.prepare(&input, &mut warnings).unwrap();
        assert!(session.ligand_score().is_err());

        session.minimise(&mut warnings).unwrap();
        assert_eq!(session.ligand_score().unwrap(), -8.5);
        let ligand = session.ligand_from_pose().unwrap();
        assert_eq!(ligand.len(), 1);
        assert_eq!(ligand.atoms()[0].name.trim(), "CX");
    }
}
