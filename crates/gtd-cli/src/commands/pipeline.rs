use std::fmt;

use anyhow::Context;
use gtd_build::Builder;

use super::BuildArgs;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    BuildApp,
    BuildImage,
    PushImage,
    PushTrigger,
    ClearApp,
    ClearImage,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::BuildApp => "build app",
            Stage::BuildImage => "build image",
            Stage::PushImage => "push image",
            Stage::PushTrigger => "push trigger",
            Stage::ClearApp => "clear app",
            Stage::ClearImage => "clear image",
        };
        f.write_str(name)
    }
}

/// Run `stages` in order on one builder, stopping at the first failure.
pub async fn run(stages: &[Stage], args: BuildArgs) -> anyhow::Result<()> {
    let builder = Builder::new(args.into_options()?);

    for &stage in stages {
        tracing::debug!(%stage, "stage started");
        match stage {
            Stage::BuildApp => builder.build_app().await,
            Stage::BuildImage => builder.build_image().await,
            Stage::PushImage => builder.push_image().await,
            Stage::PushTrigger => builder.push_trigger().await,
            Stage::ClearApp => builder.clear_app().await,
            Stage::ClearImage => builder.clear_image().await,
        }
        .with_context(|| format!("{stage} failed"))?;
    }

    Ok(())
}
