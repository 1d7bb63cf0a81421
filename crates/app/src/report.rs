//! JSON summary of a finished session

use deformation::{BackendStatus, DeformationSession, InteractionMode, VertexId};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct BackendReport {
    pub name: String,
    pub status: String,
    pub positions: Vec<[f32; 3]>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub mode: InteractionMode,
    pub radius: f64,
    pub ticks: usize,
    pub control_points: Vec<VertexId>,
    pub backends: Vec<BackendReport>,
}

fn status_text(status: &BackendStatus) -> String {
    match status {
        BackendStatus::Unprepared => "unprepared".to_string(),
        BackendStatus::Ready => "ready".to_string(),
        BackendStatus::Failed(error) => format!("failed: {error}"),
    }
}

impl Report {
    pub fn from_session(session: &DeformationSession, ticks: usize) -> Self {
        let backends = session
            .outputs()
            .iter()
            .map(|mesh| BackendReport {
                name: mesh.name.clone(),
                status: status_text(&mesh.status),
                positions: mesh.positions.iter().map(|p| p.to_array()).collect(),
            })
            .collect();
        Self {
            mode: session.mode(),
            radius: session.radius(),
            ticks,
            control_points: session.control_points().points(),
            backends,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deformation::{GridMeshBuilder, SelectionRadius, build_backend};
    use deformlab_config::{BackendKind, SolverConfig};

    #[test]
    fn test_report_fields() {
        let mesh = GridMeshBuilder::new(2, 2, 1.0, 1.0).build().unwrap();
        let solver = SolverConfig::default();
        let backends = vec![
            build_backend(BackendKind::Identity, &mesh, &solver),
            build_backend(BackendKind::Puppet, &mesh, &solver),
        ];
        let mut session =
            DeformationSession::with_backends(mesh, backends, SelectionRadius::new(0.5, 0.1, 0.1))
                .unwrap();
        session.key_released('a').unwrap();
        session.pointer_pressed(glam::DVec2::ZERO).unwrap();
        session.key_released('d').unwrap();
        session.update().unwrap();

        let report = Report::from_session(&session, 1);
        assert_eq!(report.mode, InteractionMode::Deform);
        assert_eq!(report.control_points, vec![VertexId(0)]);
        assert_eq!(report.backends[0].name, "IDENTITY");
        assert_eq!(report.backends[0].status, "ready");
        assert!(report.backends[1].status.starts_with("failed: "));
        assert_eq!(report.backends[1].positions.len(), 4);

        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["mode"], "deform");
        assert_eq!(json["control_points"][0], 0);
        assert_eq!(json["backends"][0]["positions"][1], serde_json::json!([1.0, 0.0, 0.0]));
    }
}
