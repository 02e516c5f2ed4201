use crate::path::{display, resolve};
use crate::tree::{Node, NodeKind, Stat, Tree};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use loam_common::error::ShellError;
use loam_common::shell::{Effect, ExecutionFrame, Shell};
use loam_common::timestamp::parse_touch_stamp;
use std::collections::HashSet;
use tracing::debug;

const SKELETON: &[&str] = &["/bin", "/etc", "/home", "/root", "/tmp", "/var"];

/// Flags, the `-t` value when the command takes one, and operands.
struct Invocation {
    flags: HashSet<char>,
    stamp: Option<String>,
    operands: Vec<String>,
}

impl Invocation {
    fn parse(args: &[String], takes_stamp: bool) -> Result<Self, ShellError> {
        let mut flags = HashSet::new();
        let mut stamp = None;
        let mut operands = Vec::new();
        let mut only_operands = false;

        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            if only_operands || arg == "-" || !arg.starts_with('-') {
                operands.push(arg.clone());
                continue;
            }
            if arg == "--" {
                only_operands = true;
                continue;
            }
            let letters = &arg[1..];
            for (i, c) in letters.char_indices() {
                if c == 't' && takes_stamp {
                    let inline = &letters[i + 1..];
                    let value = if inline.is_empty() {
                        iter.next().cloned().ok_or(ShellError::MissingOperand)?
                    } else {
                        inline.to_string()
                    };
                    stamp = Some(value);
                    break;
                }
                flags.insert(c);
            }
        }

        Ok(Self {
            flags,
            stamp,
            operands,
        })
    }

    fn has(&self, flag: char) -> bool {
        self.flags.contains(&flag)
    }
}

/// A fresh, in-memory filesystem implementing [`Shell`].
#[derive(Debug, Clone)]
pub struct MemoryFs {
    tree: Tree,
    clock: fn() -> DateTime<Utc>,
}

impl MemoryFs {
    /// Standard skeleton plus `home`, all stamped with the current time.
    pub fn new(home: &str) -> Self {
        Self::with_clock(home, Utc::now)
    }

    pub fn with_clock(home: &str, clock: fn() -> DateTime<Utc>) -> Self {
        let now = clock();
        let mut fs = Self {
            tree: Tree::new(now),
            clock,
        };
        for dir in SKELETON.iter().copied().chain(std::iter::once(home)) {
            fs.make_dirs(&resolve("/", home, dir), now);
        }
        fs
    }

    pub fn stat(&self, path: &str) -> Option<Stat> {
        self.tree.get(&resolve("/", "/", path)).map(Node::stat)
    }

    pub fn exists(&self, path: &str) -> bool {
        self.stat(path).is_some()
    }

    /// All paths below `/`, depth first.
    pub fn tree(&self) -> Vec<(String, Stat)> {
        self.tree.walk()
    }

    fn stamp_or_now(&self, invocation: &Invocation) -> Result<DateTime<Utc>, ShellError> {
        match &invocation.stamp {
            Some(raw) => {
                parse_touch_stamp(raw).map_err(|_| ShellError::InvalidTimestamp(raw.clone()))
            }
            None => Ok((self.clock)()),
        }
    }

    fn make_dirs(&mut self, parts: &[String], mtime: DateTime<Utc>) {
        for depth in 1..=parts.len() {
            if let Ok((children, name)) = self.tree.parent_dir_mut(&parts[..depth]) {
                children
                    .entry(name.to_string())
                    .or_insert_with(|| Node::dir(mtime));
            }
        }
    }

    pub fn touch(&mut self, frame: &ExecutionFrame, args: &[String]) -> Result<Effect, ShellError> {
        let invocation = Invocation::parse(args, true)?;
        if invocation.operands.is_empty() {
            return Err(ShellError::MissingOperand);
        }
        let mtime = self.stamp_or_now(&invocation)?;

        let mut created = Vec::new();
        let mut touched = Vec::new();
        for operand in &invocation.operands {
            let parts = resolve(&frame.cwd, &frame.home, operand);
            let shown = display(&parts);
            if let Some(node) = self.tree.get_mut(&parts) {
                node.mtime = mtime;
                touched.push(shown);
                continue;
            }
            let (children, name) = self.tree.parent_dir_mut(&parts)?;
            children.insert(name.to_string(), Node::file(Vec::new(), mtime));
            created.push(shown);
        }

        Ok(if created.is_empty() {
            Effect::Touched(touched)
        } else {
            Effect::Created(created)
        })
    }

    pub fn mkdir(&mut self, frame: &ExecutionFrame, args: &[String]) -> Result<Effect, ShellError> {
        let invocation = Invocation::parse(args, true)?;
        if invocation.operands.is_empty() {
            return Err(ShellError::MissingOperand);
        }
        let mtime = self.stamp_or_now(&invocation)?;
        let parents = invocation.has('p');

        let mut created = Vec::new();
        for operand in &invocation.operands {
            let parts = resolve(&frame.cwd, &frame.home, operand);
            let shown = display(&parts);
            match self.tree.get(&parts) {
                Some(node) if parents && node.is_dir() => continue,
                Some(_) => return Err(ShellError::AlreadyExists(shown)),
                None => {}
            }
            if parents {
                self.make_dirs(&parts, mtime);
            } else {
                let (children, name) = self.tree.parent_dir_mut(&parts)?;
                children.insert(name.to_string(), Node::dir(mtime));
            }
            created.push(shown);
        }
        Ok(Effect::Created(created))
    }

    pub fn cp(&mut self, frame: &ExecutionFrame, args: &[String]) -> Result<Effect, ShellError> {
        let invocation = Invocation::parse(args, false)?;
        let [source, target] = invocation.operands.as_slice() else {
            return Err(ShellError::MissingOperand);
        };

        let src_parts = resolve(&frame.cwd, &frame.home, source);
        let content = match self.tree.get(&src_parts).map(|n| &n.kind) {
            Some(NodeKind::File(content)) => content.clone(),
            Some(NodeKind::Dir(_)) => return Err(ShellError::IsADirectory(display(&src_parts))),
            None => return Err(ShellError::NotFound(display(&src_parts))),
        };

        let mut dst_parts = resolve(&frame.cwd, &frame.home, target);
        if self.tree.get(&dst_parts).is_some_and(Node::is_dir) {
            if let Some(name) = src_parts.last() {
                dst_parts.push(name.clone());
            }
        }
        let now = (self.clock)();
        let (children, name) = self.tree.parent_dir_mut(&dst_parts)?;
        if children.get(name).is_some_and(Node::is_dir) {
            return Err(ShellError::IsADirectory(display(&dst_parts)));
        }
        children.insert(name.to_string(), Node::file(content, now));

        Ok(Effect::Copied {
            from: display(&src_parts),
            to: display(&dst_parts),
        })
    }

    pub fn rm(&mut self, frame: &ExecutionFrame, args: &[String]) -> Result<Effect, ShellError> {
        let invocation = Invocation::parse(args, false)?;
        let recursive = invocation.has('r') || invocation.has('R');
        let force = invocation.has('f');
        if invocation.operands.is_empty() && !force {
            return Err(ShellError::MissingOperand);
        }

        let mut removed = Vec::new();
        for operand in &invocation.operands {
            let parts = resolve(&frame.cwd, &frame.home, operand);
            let shown = display(&parts);
            match self.tree.get(&parts) {
                None if force => continue,
                None => return Err(ShellError::NotFound(shown)),
                Some(node) if node.is_dir() && !recursive => {
                    return Err(ShellError::IsADirectory(shown));
                }
                Some(_) => {}
            }
            let (children, name) = self.tree.parent_dir_mut(&parts)?;
            children.remove(name);
            removed.push(shown);
        }
        Ok(Effect::Removed(removed))
    }

    pub fn rmdir(&mut self, frame: &ExecutionFrame, args: &[String]) -> Result<Effect, ShellError> {
        let invocation = Invocation::parse(args, false)?;
        if invocation.operands.is_empty() {
            return Err(ShellError::MissingOperand);
        }

        let mut removed = Vec::new();
        for operand in &invocation.operands {
            let parts = resolve(&frame.cwd, &frame.home, operand);
            let shown = display(&parts);
            match self.tree.get(&parts).map(|n| &n.kind) {
                None => return Err(ShellError::NotFound(shown)),
                Some(NodeKind::File(_)) => return Err(ShellError::NotADirectory(shown)),
                Some(NodeKind::Dir(children)) if !children.is_empty() => {
                    return Err(ShellError::DirectoryNotEmpty(shown));
                }
                Some(NodeKind::Dir(_)) => {}
            }
            let (children, name) = self.tree.parent_dir_mut(&parts)?;
            children.remove(name);
            removed.push(shown);
        }
        Ok(Effect::Removed(removed))
    }

    pub fn cd(&mut self, frame: &mut ExecutionFrame, args: &[String]) -> Result<Effect, ShellError> {
        let invocation = Invocation::parse(args, false)?;
        let target = invocation
            .operands
            .first()
            .cloned()
            .unwrap_or_else(|| frame.home.clone());

        let parts = resolve(&frame.cwd, &frame.home, &target);
        let shown = display(&parts);
        match self.tree.get(&parts) {
            Some(node) if node.is_dir() => {
                debug!(from = %frame.cwd, to = %shown, "cd");
                frame.cwd = shown.clone();
                Ok(Effect::ChangedDirectory(shown))
            }
            Some(_) => Err(ShellError::NotADirectory(shown)),
            None => Err(ShellError::NotFound(shown)),
        }
    }
}

#[async_trait]
impl Shell for MemoryFs {
    async fn create_file(
        &mut self,
        frame: &mut ExecutionFrame,
        args: &[String],
    ) -> Result<Effect, ShellError> {
        self.touch(frame, args)
    }

    async fn create_dir(
        &mut self,
        frame: &mut ExecutionFrame,
        args: &[String],
    ) -> Result<Effect, ShellError> {
        self.mkdir(frame, args)
    }

    async fn copy(
        &mut self,
        frame: &mut ExecutionFrame,
        args: &[String],
    ) -> Result<Effect, ShellError> {
        self.cp(frame, args)
    }

    async fn delete_file(
        &mut self,
        frame: &mut ExecutionFrame,
        args: &[String],
    ) -> Result<Effect, ShellError> {
        self.rm(frame, args)
    }

    async fn delete_dir(
        &mut self,
        frame: &mut ExecutionFrame,
        args: &[String],
    ) -> Result<Effect, ShellError> {
        self.rmdir(frame, args)
    }

    async fn change_directory(
        &mut self,
        frame: &mut ExecutionFrame,
        args: &[String],
    ) -> Result<Effect, ShellError> {
        self.cd(frame, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::EntryKind;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn fixed_clock() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn setup() -> (MemoryFs, ExecutionFrame) {
        (
            MemoryFs::with_clock("/root", fixed_clock),
            ExecutionFrame::non_interactive("/root"),
        )
    }

    #[test]
    fn test_skeleton() {
        let (fs, _) = setup();
        for dir in ["/root", "/tmp", "/etc", "/home"] {
            assert_eq!(fs.stat(dir).unwrap().kind, EntryKind::Directory);
        }
        assert!(!fs.exists("/root/anything"));
    }

    #[test]
    fn test_touch_with_stamp() {
        let (mut fs, frame) = setup();
        let effect = fs.touch(&frame, &args(&["-t", "2403150942", "note.txt"])).unwrap();
        assert_eq!(effect, Effect::Created(vec!["/root/note.txt".into()]));

        let stat = fs.stat("/root/note.txt").unwrap();
        assert_eq!(stat.kind, EntryKind::File);
        assert_eq!(stat.mtime, Utc.with_ymd_and_hms(2024, 3, 15, 9, 42, 0).unwrap());
    }

    #[test]
    fn test_touch_attached_stamp_and_existing() {
        let (mut fs, frame) = setup();
        fs.touch(&frame, &args(&["a"])).unwrap();
        assert_eq!(fs.stat("/root/a").unwrap().mtime, fixed_clock());

        let effect = fs.touch(&frame, &args(&["-t2001010000", "a"])).unwrap();
        assert_eq!(effect, Effect::Touched(vec!["/root/a".into()]));
        assert_eq!(
            fs.stat("/root/a").unwrap().mtime,
            Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_touch_errors() {
        let (mut fs, frame) = setup();
        assert!(matches!(
            fs.touch(&frame, &args(&["-t", "garbage", "a"])),
            Err(ShellError::InvalidTimestamp(_))
        ));
        assert!(matches!(
            fs.touch(&frame, &args(&["missing/a"])),
            Err(ShellError::NotFound(_))
        ));
        assert!(matches!(
            fs.touch(&frame, &args(&[])),
            Err(ShellError::MissingOperand)
        ));
    }

    #[test]
    fn test_mkdir() {
        let (mut fs, frame) = setup();
        fs.mkdir(&frame, &args(&["dir"])).unwrap();
        assert!(matches!(
            fs.mkdir(&frame, &args(&["dir"])),
            Err(ShellError::AlreadyExists(_))
        ));
        assert!(matches!(
            fs.mkdir(&frame, &args(&["x/y"])),
            Err(ShellError::NotFound(_))
        ));

        fs.mkdir(&frame, &args(&["-p", "x/y/z"])).unwrap();
        assert!(fs.exists("/root/x/y/z"));
        // -p tolerates an existing directory
        fs.mkdir(&frame, &args(&["-p", "x/y"])).unwrap();
    }

    #[test]
    fn test_cp_into_directory() {
        let (mut fs, frame) = setup();
        fs.touch(&frame, &args(&["a"])).unwrap();
        fs.mkdir(&frame, &args(&["d"])).unwrap();

        let effect = fs.cp(&frame, &args(&["a", "d"])).unwrap();
        assert_eq!(
            effect,
            Effect::Copied {
                from: "/root/a".into(),
                to: "/root/d/a".into()
            }
        );
        fs.cp(&frame, &args(&["a", "b"])).unwrap();
        assert!(fs.exists("/root/b"));

        assert!(matches!(
            fs.cp(&frame, &args(&["d", "e"])),
            Err(ShellError::IsADirectory(_))
        ));
        assert!(matches!(
            fs.cp(&frame, &args(&["a"])),
            Err(ShellError::MissingOperand)
        ));
    }

    #[test]
    fn test_rm() {
        let (mut fs, frame) = setup();
        fs.mkdir(&frame, &args(&["-p", "d/e"])).unwrap();
        fs.touch(&frame, &args(&["f"])).unwrap();

        fs.rm(&frame, &args(&["f"])).unwrap();
        assert!(!fs.exists("/root/f"));
        assert!(matches!(
            fs.rm(&frame, &args(&["d"])),
            Err(ShellError::IsADirectory(_))
        ));
        assert!(matches!(
            fs.rm(&frame, &args(&["nope"])),
            Err(ShellError::NotFound(_))
        ));
        fs.rm(&frame, &args(&["-f", "nope"])).unwrap();
        fs.rm(&frame, &args(&["-rf", "d"])).unwrap();
        assert!(!fs.exists("/root/d"));
    }

    #[test]
    fn test_rmdir() {
        let (mut fs, frame) = setup();
        fs.mkdir(&frame, &args(&["-p", "d/e"])).unwrap();
        fs.touch(&frame, &args(&["f"])).unwrap();

        assert!(matches!(
            fs.rmdir(&frame, &args(&["d"])),
            Err(ShellError::DirectoryNotEmpty(_))
        ));
        assert!(matches!(
            fs.rmdir(&frame, &args(&["f"])),
            Err(ShellError::NotADirectory(_))
        ));
        fs.rmdir(&frame, &args(&["d/e", "d"])).unwrap();
        assert!(!fs.exists("/root/d"));
    }

    #[test]
    fn test_cd() {
        let (mut fs, mut frame) = setup();
        fs.mkdir(&frame, &args(&["dir"])).unwrap();
        fs.touch(&frame, &args(&["file"])).unwrap();

        fs.cd(&mut frame, &args(&["dir"])).unwrap();
        assert_eq!(frame.cwd, "/root/dir");
        fs.touch(&frame, &args(&["inner"])).unwrap();
        assert!(fs.exists("/root/dir/inner"));

        assert!(matches!(
            fs.cd(&mut frame, &args(&["../file"])),
            Err(ShellError::NotADirectory(_))
        ));
        assert_eq!(frame.cwd, "/root/dir");

        fs.cd(&mut frame, &args(&[])).unwrap();
        assert_eq!(frame.cwd, "/root");
    }

    #[test]
    fn test_double_dash_operands() {
        let (mut fs, frame) = setup();
        fs.touch(&frame, &args(&["--", "-weird"])).unwrap();
        assert!(fs.exists("/root/-weird"));
    }
}
