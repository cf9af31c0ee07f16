use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::{Path, PathBuf};

use super::backend::{CompiledStage, ShaderBackend, UniformLocation};
use super::error::{ShaderError, ShaderStage, StageDiagnostic};
use super::source::{FsSource, SourceLoader};

/// Where a program was loaded from and which uniforms it must expose.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramDesc {
    pub vertex_path: PathBuf,
    pub fragment_path: PathBuf,
    pub uniforms: Vec<String>,
}

/// A linked program owned by a [`ShaderCache`].
///
/// The uniform table is resolved once at link time and never changes.
#[derive(Debug)]
pub struct ShaderProgram<P> {
    name: String,
    program: P,
    uniforms: HashMap<String, UniformLocation>,
    desc: ProgramDesc,
    generation: u64,
}

impl<P> ShaderProgram<P> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Backend program handle.
    pub fn raw(&self) -> &P {
        &self.program
    }

    pub fn uniform(&self, name: &str) -> Option<UniformLocation> {
        self.uniforms.get(name).copied()
    }

    pub fn uniforms(&self) -> impl Iterator<Item = (&str, UniformLocation)> + '_ {
        self.uniforms.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn desc(&self) -> &ProgramDesc {
        &self.desc
    }

    /// Cache-wide load counter value at the time this program was stored.
    ///
    /// A reload under the same name always yields a larger generation.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Name-keyed cache of linked shader programs.
///
/// Loading runs read → compile (both stages) → link → resolve uniforms, and
/// only inserts the program when every step succeeded. Dropping the cache
/// releases every program it still owns.
pub struct ShaderCache<B, L = FsSource>
where
    B: ShaderBackend,
    L: SourceLoader,
{
    backend: B,
    loader: L,
    programs: HashMap<String, ShaderProgram<B::Program>>,
    generation: u64,
}

impl<B> ShaderCache<B, FsSource>
where
    B: ShaderBackend,
{
    pub fn new(backend: B) -> Self {
        Self::with_loader(backend, FsSource)
    }
}

impl<B, L> ShaderCache<B, L>
where
    B: ShaderBackend,
    L: SourceLoader,
{
    pub fn with_loader(backend: B, loader: L) -> Self {
        Self {
            backend,
            loader,
            programs: HashMap::new(),
            generation: 0,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Compiles and links `vertex_path` + `fragment_path` and stores the result
    /// under `name`, replacing (and releasing) any previous program of that name.
    ///
    /// Every name in `uniforms` must resolve, otherwise the program is rejected.
    /// On failure the cache is left exactly as it was.
    pub fn load(
        &mut self,
        name: &str,
        vertex_path: impl AsRef<Path>,
        fragment_path: impl AsRef<Path>,
        uniforms: &[&str],
    ) -> Result<&ShaderProgram<B::Program>, ShaderError> {
        let desc = ProgramDesc {
            vertex_path: vertex_path.as_ref().to_path_buf(),
            fragment_path: fragment_path.as_ref().to_path_buf(),
            uniforms: uniforms.iter().map(|u| u.to_string()).collect(),
        };
        self.load_desc(name, desc)
    }

    /// Reloads `name` from the paths it was originally loaded from.
    pub fn reload(&mut self, name: &str) -> Result<&ShaderProgram<B::Program>, ShaderError> {
        let desc = self
            .programs
            .get(name)
            .map(|p| p.desc.clone())
            .ok_or_else(|| ShaderError::NotLoaded { name: name.to_string() })?;
        self.load_desc(name, desc)
    }

    /// Same as [`load`](Self::load) with a prepared description.
    pub fn load_desc(
        &mut self,
        name: &str,
        desc: ProgramDesc,
    ) -> Result<&ShaderProgram<B::Program>, ShaderError> {
        let vertex_source = self.read_source(&desc.vertex_path)?;
        let fragment_source = self.read_source(&desc.fragment_path)?;

        let (vertex, fragment) = self.compile_stages(name, &vertex_source, &fragment_source)?;

        let linked = self.backend.link(name, &vertex, &fragment);
        self.backend.release_stage(vertex);
        self.backend.release_stage(fragment);

        let program = linked.map_err(|log| {
            log::error!("program `{name}` failed to link:\n{log}");
            ShaderError::Link { log }
        })?;

        let uniforms = match self.resolve_uniforms(name, &program, &desc.uniforms) {
            Ok(uniforms) => uniforms,
            Err(err) => {
                self.backend.release_program(program);
                return Err(err);
            }
        };

        self.generation += 1;
        let entry = ShaderProgram {
            name: name.to_string(),
            program,
            uniforms,
            desc,
            generation: self.generation,
        };

        match self.programs.entry(name.to_string()) {
            Entry::Occupied(mut slot) => {
                let previous = slot.insert(entry);
                log::debug!(
                    "program `{name}` replaced (generation {} -> {})",
                    previous.generation,
                    self.generation
                );
                self.backend.release_program(previous.program);
                Ok(slot.into_mut())
            }
            Entry::Vacant(slot) => {
                log::debug!("program `{name}` loaded (generation {})", self.generation);
                Ok(slot.insert(entry))
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&ShaderProgram<B::Program>> {
        self.programs.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.programs.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.programs.keys().map(String::as_str)
    }

    /// Releases the program stored under `name`. Returns whether one existed.
    pub fn release(&mut self, name: &str) -> bool {
        match self.programs.remove(name) {
            Some(entry) => {
                log::debug!("program `{name}` released");
                self.backend.release_program(entry.program);
                true
            }
            None => false,
        }
    }

    /// Releases every program. Safe to call repeatedly.
    pub fn release_all(&mut self) {
        for (name, entry) in self.programs.drain() {
            log::debug!("program `{name}` released");
            self.backend.release_program(entry.program);
        }
    }

    // ── private helpers ────────────────────────────────────────────────────

    fn read_source(&self, path: &Path) -> Result<String, ShaderError> {
        let text = self.loader.load_text(path).map_err(|e| {
            log::error!("shader source {path:?} could not be read: {e}");
            ShaderError::SourceNotFound {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }
        })?;

        if text.trim().is_empty() {
            log::error!("shader source {path:?} is empty");
            return Err(ShaderError::SourceNotFound {
                path: path.to_path_buf(),
                reason: "file is empty".to_string(),
            });
        }

        Ok(text)
    }

    /// Compiles both stages. The fragment stage is compiled even when the
    /// vertex stage failed so both logs reach the caller.
    fn compile_stages(
        &mut self,
        name: &str,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<(B::Stage, B::Stage), ShaderError> {
        let vertex = self.backend.compile(ShaderStage::Vertex, name, vertex_source);
        let fragment = self.backend.compile(ShaderStage::Fragment, name, fragment_source);

        let diagnostics = vec![
            diagnostic(ShaderStage::Vertex, &vertex),
            diagnostic(ShaderStage::Fragment, &fragment),
        ];

        for d in &diagnostics {
            if !d.success {
                log::error!("program `{name}`: {} stage failed to compile:\n{}", d.stage, d.log);
            } else if !d.log.is_empty() {
                log::debug!("program `{name}`: {} stage info log:\n{}", d.stage, d.log);
            }
        }

        match (vertex, fragment) {
            (Ok(v), Ok(f)) => Ok((v.stage, f.stage)),
            (vertex, fragment) => {
                if let Ok(v) = vertex {
                    self.backend.release_stage(v.stage);
                }
                if let Ok(f) = fragment {
                    self.backend.release_stage(f.stage);
                }

                let (stage, log) = diagnostics
                    .iter()
                    .find(|d| !d.success)
                    .map(|d| (d.stage, d.log.clone()))
                    .unwrap_or((ShaderStage::Vertex, String::new()));

                Err(ShaderError::Compile {
                    stage,
                    log,
                    diagnostics,
                })
            }
        }
    }

    fn resolve_uniforms(
        &self,
        name: &str,
        program: &B::Program,
        requested: &[String],
    ) -> Result<HashMap<String, UniformLocation>, ShaderError> {
        let mut table = HashMap::with_capacity(requested.len());
        for uniform in requested {
            let Some(location) = self.backend.uniform_location(program, uniform) else {
                log::error!("program `{name}`: uniform `{uniform}` not found");
                return Err(ShaderError::UniformNotFound {
                    program: name.to_string(),
                    name: uniform.clone(),
                });
            };
            table.insert(uniform.clone(), location);
        }
        Ok(table)
    }
}

impl<B, L> Drop for ShaderCache<B, L>
where
    B: ShaderBackend,
    L: SourceLoader,
{
    fn drop(&mut self) {
        self.release_all();
    }
}

fn diagnostic<S>(stage: ShaderStage, result: &Result<CompiledStage<S>, String>) -> StageDiagnostic {
    match result {
        Ok(compiled) => StageDiagnostic {
            stage,
            success: true,
            log: compiled.log.clone(),
        },
        Err(log) => StageDiagnostic {
            stage,
            success: false,
            log: log.clone(),
        },
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::{HashMap, HashSet};
    use std::rc::Rc;

    use super::*;
    use crate::shader::reflect::{self, LinkedInterface, ReflectedStage};
    use crate::shader::source::memory::MemorySource;

    // ── recording backend ──────────────────────────────────────────────────
    //
    // Source conventions understood by the fake compiler:
    //   `#error`        compile failure
    //   `#warn`         compile success with an info log
    //   `#nolink`       link failure
    //   `uniform NAME`  declares a uniform at binding = declaration order

    struct FakeStage {
        id: u32,
        nolink: bool,
        uniforms: Vec<String>,
    }

    #[derive(Debug)]
    struct FakeProgram {
        id: u32,
        uniforms: HashMap<String, UniformLocation>,
    }

    #[derive(Default)]
    struct FakeBackend {
        next_id: u32,
        live_stages: HashSet<u32>,
        /// Shared so it can be inspected after the cache is dropped.
        live_programs: Rc<RefCell<HashSet<u32>>>,
        compiled: Vec<ShaderStage>,
    }

    impl FakeBackend {
        fn id(&mut self) -> u32 {
            self.next_id += 1;
            self.next_id
        }
    }

    impl ShaderBackend for FakeBackend {
        type Stage = FakeStage;
        type Program = FakeProgram;

        fn compile(
            &mut self,
            stage: ShaderStage,
            _label: &str,
            source: &str,
        ) -> Result<CompiledStage<FakeStage>, String> {
            self.compiled.push(stage);
            if source.contains("#error") {
                return Err(format!("{stage}: 0:1: syntax error"));
            }
            let id = self.id();
            self.live_stages.insert(id);
            let uniforms = source
                .lines()
                .filter_map(|l| l.trim().strip_prefix("uniform "))
                .map(|u| u.trim().to_string())
                .collect();
            Ok(CompiledStage {
                stage: FakeStage {
                    id,
                    nolink: source.contains("#nolink"),
                    uniforms,
                },
                log: if source.contains("#warn") { "warning: unused".into() } else { String::new() },
            })
        }

        fn link(
            &mut self,
            _label: &str,
            vertex: &FakeStage,
            fragment: &FakeStage,
        ) -> Result<FakeProgram, String> {
            if vertex.nolink || fragment.nolink {
                return Err("error: varying mismatch".into());
            }
            let id = self.id();
            self.live_programs.borrow_mut().insert(id);
            let uniforms = vertex
                .uniforms
                .iter()
                .chain(&fragment.uniforms)
                .enumerate()
                .map(|(i, u)| (u.clone(), UniformLocation::new(0, i as u32)))
                .collect();
            Ok(FakeProgram { id, uniforms })
        }

        fn uniform_location(&self, program: &FakeProgram, name: &str) -> Option<UniformLocation> {
            program.uniforms.get(name).copied()
        }

        fn release_stage(&mut self, stage: FakeStage) {
            assert!(self.live_stages.remove(&stage.id), "stage released twice");
        }

        fn release_program(&mut self, program: FakeProgram) {
            assert!(
                self.live_programs.borrow_mut().remove(&program.id),
                "program released twice"
            );
        }
    }

    const VERT: &str = "void main() {}\nuniform u_offset\n";
    const FRAG: &str = "void main() {}\nuniform u_color\n";

    fn cache(files: MemorySource) -> ShaderCache<FakeBackend, MemorySource> {
        ShaderCache::with_loader(FakeBackend::default(), files)
    }

    fn ok_files() -> MemorySource {
        MemorySource::default().with("ok.vert", VERT).with("ok.frag", FRAG)
    }

    // ── load ───────────────────────────────────────────────────────────────

    #[test]
    fn load_resolves_every_requested_uniform() {
        let mut c = cache(ok_files());
        let program = c.load("x", "ok.vert", "ok.frag", &["u_offset", "u_color"]).unwrap();

        assert_eq!(program.name(), "x");
        assert_eq!(program.uniform("u_offset"), Some(UniformLocation::new(0, 0)));
        assert_eq!(program.uniform("u_color"), Some(UniformLocation::new(0, 1)));
        assert_eq!(program.uniforms().count(), 2);
        assert!(c.contains("x"));
        assert_eq!(c.backend().live_programs.borrow().len(), 1);
        // Stages are released once the program is linked.
        assert!(c.backend().live_stages.is_empty());
    }

    #[test]
    fn missing_fragment_source_creates_nothing() {
        let files = MemorySource::default().with("ok.vert", VERT);
        let mut c = cache(files);

        let err = c.load("x", "ok.vert", "missing.frag", &[]).unwrap_err();
        match err {
            ShaderError::SourceNotFound { path, .. } => assert_eq!(path, PathBuf::from("missing.frag")),
            other => panic!("unexpected error: {other}"),
        }
        assert!(!c.contains("x"));
        assert!(c.backend().compiled.is_empty());
        assert!(c.backend().live_programs.borrow().is_empty());
    }

    #[test]
    fn empty_source_is_not_found() {
        let files = ok_files().with("blank.frag", "  \n");
        let mut c = cache(files);
        let err = c.load("x", "ok.vert", "blank.frag", &[]).unwrap_err();
        assert!(matches!(err, ShaderError::SourceNotFound { .. }));
    }

    #[test]
    fn fragment_compile_error_keeps_vertex_diagnostic() {
        let files = ok_files().with("bad.frag", "#error\n");
        let mut c = cache(files);

        let err = c.load("x", "ok.vert", "bad.frag", &[]).unwrap_err();
        let ShaderError::Compile { stage, ref log, .. } = err else {
            panic!("expected compile error, got {err}");
        };
        assert_eq!(stage, ShaderStage::Fragment);
        assert!(log.contains("syntax error"));

        let vertex = err.stage_diagnostic(ShaderStage::Vertex).unwrap();
        assert!(vertex.success);

        assert!(!c.contains("x"));
        assert!(c.backend().live_stages.is_empty());
        assert!(c.backend().live_programs.borrow().is_empty());
    }

    #[test]
    fn both_stages_are_compiled_when_vertex_fails() {
        let files = MemorySource::default()
            .with("bad.vert", "#error\n")
            .with("bad.frag", "#error\n");
        let mut c = cache(files);

        let err = c.load("x", "bad.vert", "bad.frag", &[]).unwrap_err();
        assert_eq!(
            c.backend().compiled,
            vec![ShaderStage::Vertex, ShaderStage::Fragment]
        );
        let ShaderError::Compile { stage, ref diagnostics, .. } = err else {
            panic!("expected compile error, got {err}");
        };
        assert_eq!(stage, ShaderStage::Vertex);
        assert_eq!(diagnostics.len(), 2);
        assert!(diagnostics.iter().all(|d| !d.success && !d.log.is_empty()));
    }

    #[test]
    fn successful_stage_info_log_is_reported() {
        let files = MemorySource::default()
            .with("warn.vert", "#warn\n")
            .with("bad.frag", "#error\n");
        let mut c = cache(files);
        let err = c.load("x", "warn.vert", "bad.frag", &[]).unwrap_err();
        let vertex = err.stage_diagnostic(ShaderStage::Vertex).unwrap();
        assert!(vertex.success);
        assert_eq!(vertex.log, "warning: unused");
    }

    #[test]
    fn link_failure_releases_stages() {
        let files = ok_files().with("nolink.frag", "#nolink\n");
        let mut c = cache(files);
        let err = c.load("x", "ok.vert", "nolink.frag", &[]).unwrap_err();
        assert!(matches!(err, ShaderError::Link { ref log } if log.contains("mismatch")));
        assert!(c.backend().live_stages.is_empty());
        assert!(c.is_empty());
    }

    #[test]
    fn unknown_uniform_rejects_program() {
        let mut c = cache(ok_files());
        let err = c.load("x", "ok.vert", "ok.frag", &["u_color", "u_time"]).unwrap_err();
        match err {
            ShaderError::UniformNotFound { program, name } => {
                assert_eq!(program, "x");
                assert_eq!(name, "u_time");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(c.is_empty());
        assert!(c.backend().live_programs.borrow().is_empty());
    }

    // ── replacement ───────────────────────────────────────────────────────

    #[test]
    fn loading_same_name_replaces_and_releases_previous() {
        let mut c = cache(ok_files());
        let first = c.load("x", "ok.vert", "ok.frag", &["u_color"]).unwrap().generation();
        let second = c.load("x", "ok.vert", "ok.frag", &["u_color"]).unwrap().generation();

        assert!(second > first);
        assert_eq!(c.len(), 1);
        assert_eq!(c.backend().live_programs.borrow().len(), 1);
    }

    #[test]
    fn failed_reload_keeps_existing_program() {
        let files = ok_files().with("bad.frag", "#error\n");
        let mut c = cache(files);
        let generation = c.load("x", "ok.vert", "ok.frag", &[]).unwrap().generation();

        assert!(c.load("x", "ok.vert", "bad.frag", &[]).is_err());
        assert_eq!(c.get("x").map(|p| p.generation()), Some(generation));
        assert_eq!(c.backend().live_programs.borrow().len(), 1);
    }

    #[test]
    fn reload_uses_recorded_description() {
        let mut c = cache(ok_files());
        let generation = c.load("x", "ok.vert", "ok.frag", &["u_offset"]).unwrap().generation();

        let program = c.reload("x").unwrap();
        assert!(program.generation() > generation);
        assert_eq!(program.desc().vertex_path, PathBuf::from("ok.vert"));
        assert!(program.uniform("u_offset").is_some());
        assert_eq!(c.backend().live_programs.borrow().len(), 1);
    }

    #[test]
    fn reload_unknown_name_fails() {
        let mut c = cache(ok_files());
        assert!(matches!(c.reload("nope"), Err(ShaderError::NotLoaded { .. })));
    }

    // ── teardown ──────────────────────────────────────────────────────────

    #[test]
    fn release_is_idempotent() {
        let mut c = cache(ok_files());
        c.load("x", "ok.vert", "ok.frag", &[]).unwrap();

        assert!(c.release("x"));
        assert!(!c.release("x"));
        assert!(c.backend().live_programs.borrow().is_empty());
    }

    #[test]
    fn release_all_on_empty_cache_is_a_no_op() {
        let mut c = cache(ok_files());
        c.release_all();
        c.release_all();
        assert!(c.is_empty());
    }

    #[test]
    fn release_all_frees_every_program() {
        let mut c = cache(ok_files());
        c.load("a", "ok.vert", "ok.frag", &[]).unwrap();
        c.load("b", "ok.vert", "ok.frag", &[]).unwrap();

        let mut names: Vec<_> = c.names().map(str::to_string).collect();
        names.sort();
        assert_eq!(names, ["a", "b"]);

        c.release_all();
        assert!(c.is_empty());
        assert!(c.backend().live_programs.borrow().is_empty());
    }

    #[test]
    fn dropping_the_cache_releases_every_program() {
        let mut c = cache(ok_files());
        c.load("a", "ok.vert", "ok.frag", &[]).unwrap();
        c.load("b", "ok.vert", "ok.frag", &[]).unwrap();

        let live = Rc::clone(&c.backend().live_programs);
        assert_eq!(live.borrow().len(), 2);

        drop(c);
        assert!(live.borrow().is_empty());
    }

    // ── WGSL front end ────────────────────────────────────────────────────
    //
    // Runs the naga reflection path through the cache without a device.

    struct ReflectBackend;

    impl ShaderBackend for ReflectBackend {
        type Stage = ReflectedStage;
        type Program = LinkedInterface;

        fn compile(
            &mut self,
            stage: ShaderStage,
            _label: &str,
            source: &str,
        ) -> Result<CompiledStage<ReflectedStage>, String> {
            reflect::compile_stage(stage, source).map(|stage| CompiledStage {
                stage,
                log: String::new(),
            })
        }

        fn link(
            &mut self,
            _label: &str,
            vertex: &ReflectedStage,
            fragment: &ReflectedStage,
        ) -> Result<LinkedInterface, String> {
            reflect::link(vertex, fragment)
        }

        fn uniform_location(&self, program: &LinkedInterface, name: &str) -> Option<UniformLocation> {
            program.uniforms.get(name).copied()
        }

        fn release_stage(&mut self, _stage: ReflectedStage) {}

        fn release_program(&mut self, _program: LinkedInterface) {}
    }

    const WGSL_UNIFORM: &str = "
struct Params { color: vec4<f32> };
@group(0) @binding(0) var<uniform> shape: Params;
";

    const WGSL_VERT: &str = "
@vertex
fn vs_main(@location(0) position: vec2<f32>) -> @builtin(position) vec4<f32> {
    return vec4<f32>(position, 0.0, 1.0);
}
";

    fn wgsl_files(fragment_body: &str) -> MemorySource {
        MemorySource::default()
            .with("s.vert", &format!("{WGSL_UNIFORM}{WGSL_VERT}"))
            .with("s.frag", &format!("{WGSL_UNIFORM}{fragment_body}"))
    }

    #[test]
    fn uniform_read_by_a_stage_resolves() {
        let files = wgsl_files(
            "@fragment fn fs_main() -> @location(0) vec4<f32> { return shape.color; }",
        );
        let mut c = ShaderCache::with_loader(ReflectBackend, files);
        let program = c.load("s", "s.vert", "s.frag", &["shape"]).unwrap();
        assert_eq!(program.uniform("shape"), Some(UniformLocation::new(0, 0)));
    }

    #[test]
    fn declared_but_unread_uniform_is_not_found() {
        let files = wgsl_files(
            "@fragment fn fs_main() -> @location(0) vec4<f32> { return vec4<f32>(1.0); }",
        );
        let mut c = ShaderCache::with_loader(ReflectBackend, files);
        let err = c.load("s", "s.vert", "s.frag", &["shape"]).unwrap_err();
        assert!(
            matches!(err, ShaderError::UniformNotFound { ref name, .. } if name == "shape"),
            "{err}"
        );
        assert!(c.is_empty());
    }
}
