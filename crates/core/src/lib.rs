//! Pooled frame analysis for exam proctoring services.
//!
//! A small, fixed set of non-reentrant analysis engines is shared between
//! many concurrent callers through an [`pool::instance_pool::InstancePool`]
//! and a fixed-size [`dispatch::dispatcher::Dispatcher`].

pub mod analysis {
    pub mod domain {
        pub mod analysis;
        pub mod frame_analyzer;
        pub mod gaze_estimator;
        pub mod verification_policy;
    }
    pub mod infrastructure;
}

pub mod detection {
    pub mod domain {
        pub mod face_classifier;
        pub mod face_detector;
        pub mod face_embedder;
        pub mod face_landmarks;
    }
    pub mod infrastructure;
}

pub mod dispatch {
    pub mod admission;
    pub mod dispatcher;
    pub mod job_result;
}

pub mod pool {
    pub mod instance_pool;
}

pub mod registry {
    pub mod student_registry;
}

pub mod service {
    pub mod analysis_service;
    pub mod report;
    pub mod service_kind;
}

pub mod shared {
    pub mod constants;
    pub mod face_box;
    pub mod frame;
    pub mod model_resolver;
}

pub mod stats {
    pub mod stats_registry;
}

pub mod validation {
    pub mod frame_validator;
}
