//! Built-in failure signatures
//!
//! Groups are registered in a fixed order (proto, go, frontend, config, docker, generic).
//! The order matters: on equal scores the earlier pattern wins.

use super::pattern::{Confidence, ErrorPattern, PatternError};
use crate::report::Phase;

pub fn builtin_patterns() -> Result<Vec<ErrorPattern>, PatternError> {
    let mut patterns = Vec::new();
    patterns.extend(proto_patterns()?);
    patterns.extend(go_patterns()?);
    patterns.extend(frontend_patterns()?);
    patterns.extend(config_patterns()?);
    patterns.extend(docker_patterns()?);
    patterns.extend(generic_patterns()?);
    Ok(patterns)
}

fn proto_patterns() -> Result<Vec<ErrorPattern>, PatternError> {
    Ok(vec![
        ErrorPattern::new(
            "protoc-plugin-missing",
            "A protoc plugin is not installed or not on PATH",
            "Install the missing plugin (e.g. `go install google.golang.org/protobuf/cmd/protoc-gen-go@latest`) and make sure $GOPATH/bin is on PATH",
            Confidence::High,
        )
        .with_regex(r"protoc-gen-[\w-]+: (program not found|not found|No such file)")?
        .for_phase(Phase::ProtoGen),
        ErrorPattern::new(
            "proto-import-not-found",
            "A .proto file imports a file that is not on the include path",
            "Check the import path and pass the directory containing it with -I/--proto_path",
            Confidence::High,
        )
        .with_regex(r#"Import "[^"]+" was not found"#)?
        .for_phase(Phase::ProtoGen),
        ErrorPattern::new(
            "protoc-missing",
            "The protobuf compiler is not installed",
            "Install protoc (e.g. `brew install protobuf` or `apt install protobuf-compiler`)",
            Confidence::High,
        )
        .with_regex(r"protoc: (command )?not found")?
        .for_phase(Phase::ProtoGen),
        ErrorPattern::new(
            "proto-syntax",
            "A .proto file has a syntax error",
            "Open the file and line reported by protoc and fix the definition",
            Confidence::Medium,
        )
        .with_regex(r"\.proto:\d+:\d+: ")?
        .for_phase(Phase::ProtoGen),
        ErrorPattern::new(
            "buf-lint",
            "buf rejected the schema during lint or breaking-change checks",
            "Run `buf lint` locally and resolve the reported rule violations",
            Confidence::Low,
        )
        .with_substrings(["buf", "failure"])
        .for_phase(Phase::ProtoGen),
    ])
}

fn go_patterns() -> Result<Vec<ErrorPattern>, PatternError> {
    Ok(vec![
        ErrorPattern::new(
            "go-undefined",
            "Code references an identifier that does not exist, often after regenerated code changed",
            "Regenerate protos for the dependent repository, or update the call site to the new API",
            Confidence::High,
        )
        .with_regex(r"undefined:\s*\w+")?
        .for_phase(Phase::Build),
        ErrorPattern::new(
            "go-type-mismatch",
            "A value is used with an incompatible type",
            "Check the reported line; generated types may have changed signature",
            Confidence::High,
        )
        .with_regex(r"cannot use .+ \(.+\) as .+ (value|type)")?
        .for_phase(Phase::Build),
        ErrorPattern::new(
            "go-missing-module",
            "A required Go module is missing from go.sum or the module cache",
            "Run `go mod tidy` (or `go mod download`) in the failing repository",
            Confidence::High,
        )
        .with_regex(r"(missing go\.sum entry|no required module provides package)")?
        .for_phase(Phase::Build),
        ErrorPattern::new(
            "go-version-mismatch",
            "The installed Go toolchain is older than the module requires",
            "Upgrade Go to the version declared in go.mod",
            Confidence::Medium,
        )
        .with_regex(r"requires go >= ?[\d.]+")?
        .for_phase(Phase::Build),
        ErrorPattern::new(
            "go-too-many-errors",
            "The compiler stopped after too many errors, usually one root cause",
            "Fix the first reported error; the rest often disappear with it",
            Confidence::Medium,
        )
        .with_substrings(["too many errors"])
        .for_phase(Phase::Build),
        ErrorPattern::new(
            "go-build-exit",
            "The Go build exited with a failure status",
            "Re-run the build for the service directly to see the full compiler output",
            Confidence::Low,
        )
        .with_regex(r"exit status \d+")?
        .with_substrings(["go build"])
        .for_phase(Phase::Build),
    ])
}

fn frontend_patterns() -> Result<Vec<ErrorPattern>, PatternError> {
    Ok(vec![
        ErrorPattern::new(
            "npm-eresolve",
            "npm could not resolve a consistent dependency tree",
            "Retry with `npm install --legacy-peer-deps` or align the conflicting peer versions",
            Confidence::High,
        )
        .with_regex(r"ERESOLVE")?
        .for_phase(Phase::FrontendGen),
        ErrorPattern::new(
            "node-modules-missing",
            "Front-end dependencies are not installed",
            "Run `npm install` (or `pnpm install`) in the front-end repository",
            Confidence::High,
        )
        .with_regex(r"(Cannot find module|command not found: (openapi|orval|tsc))")?
        .for_phase(Phase::FrontendGen),
        ErrorPattern::new(
            "openapi-spec-unreachable",
            "The client generator could not fetch the API schema",
            "Check that the gateway is running and serving its OpenAPI document",
            Confidence::Medium,
        )
        .with_regex(r"(ECONNREFUSED|fetch failed)")?
        .for_phase(Phase::FrontendGen),
        ErrorPattern::new(
            "typescript-errors",
            "Generated client code does not type-check",
            "Regenerate the client after the API build succeeds, then fix the reported TS errors",
            Confidence::Medium,
        )
        .with_regex(r"error TS\d+:")?
        .for_phase(Phase::FrontendGen),
    ])
}

fn config_patterns() -> Result<Vec<ErrorPattern>, PatternError> {
    Ok(vec![
        ErrorPattern::new(
            "yaml-syntax",
            "A configuration template or override is not valid YAML",
            "Check indentation and quoting around the reported line",
            Confidence::High,
        )
        .with_regex(r"yaml: line \d+:")?
        .for_phase(Phase::ConfigGen),
        ErrorPattern::new(
            "config-template-missing",
            "A configuration template file could not be found",
            "Make sure all repositories are cloned and the template path in settings is correct",
            Confidence::Medium,
        )
        .with_substrings(["template", "no such file"])
        .for_phase(Phase::ConfigGen),
    ])
}

fn docker_patterns() -> Result<Vec<ErrorPattern>, PatternError> {
    Ok(vec![
        ErrorPattern::new(
            "docker-daemon-down",
            "The container runtime is not running",
            "Start Docker Desktop or the docker service, then retry",
            Confidence::High,
        )
        .with_regex(r"Cannot connect to the Docker daemon")?,
        ErrorPattern::new(
            "port-allocated",
            "A service port is already bound by another process",
            "Stop the process holding the port (`lsof -i :<port>`) or change the port mapping",
            Confidence::High,
        )
        .with_regex(r"(port is already allocated|address already in use)")?,
        ErrorPattern::new(
            "network-missing",
            "A container references a network that does not exist",
            "Recreate the stack networks (`docker network create <name>`) or restart the stack",
            Confidence::Medium,
        )
        .with_regex(r"network [\w.-]+ not found")?
        .for_phase(Phase::Restart),
        ErrorPattern::new(
            "image-pull-denied",
            "An image could not be pulled",
            "Log in to the registry (`docker login`) or build the image locally",
            Confidence::Medium,
        )
        .with_substrings(["pull access denied"]),
        ErrorPattern::new(
            "container-unhealthy",
            "A container started but never reported healthy",
            "Inspect the container logs (`docker logs <name>`) for startup errors",
            Confidence::Low,
        )
        .with_substrings(["unhealthy"])
        .for_phase(Phase::Restart),
    ])
}

fn generic_patterns() -> Result<Vec<ErrorPattern>, PatternError> {
    Ok(vec![
        ErrorPattern::new(
            "disk-full",
            "The disk is full",
            "Free space, e.g. `docker system prune` and clearing build caches",
            Confidence::High,
        )
        .with_regex(r"(?i)no space left on device")?,
        ErrorPattern::new(
            "permission-denied",
            "A file or socket could not be accessed",
            "Check ownership of the reported path, or that your user can access the docker socket",
            Confidence::Medium,
        )
        .with_substrings(["permission denied"]),
        ErrorPattern::new(
            "command-not-found",
            "A required tool is not installed",
            "Install the missing tool and make sure it is on PATH",
            Confidence::Low,
        )
        .with_regex(r"(command not found|executable file not found)")?,
    ])
}
